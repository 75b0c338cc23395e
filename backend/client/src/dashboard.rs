//! Text renderings of the petitioner and admin dashboards.
use std::fmt::Write;

use payloads::{PetitionView, Status};

const BAR_WIDTH: usize = 40;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct StatusCounts {
    pub open: usize,
    pub closed: usize,
}

pub fn counts(petitions: &[PetitionView]) -> StatusCounts {
    petitions
        .iter()
        .fold(StatusCounts::default(), |mut counts, petition| {
            match petition.status {
                Status::Open => counts.open += 1,
                Status::Closed => counts.closed += 1,
            }
            counts
        })
}

fn bar(value: usize, max: usize) -> String {
    if max == 0 {
        return String::new();
    }

    // Non-zero values always get at least one cell
    let cells = (value * BAR_WIDTH).div_ceil(max);
    "#".repeat(cells)
}

/// Horizontal bar chart of open vs closed petitions.
pub fn render_chart(counts: StatusCounts) -> String {
    let max = counts.open.max(counts.closed);

    let mut out = String::from("Petition Status Overview\n");
    let _ = writeln!(out, "Open Petitions   | {} {}", bar(counts.open, max), counts.open);
    let _ = writeln!(
        out,
        "Closed Petitions | {} {}",
        bar(counts.closed, max),
        counts.closed
    );

    out
}

fn render_card(out: &mut String, petition: &PetitionView) {
    let _ = writeln!(out, "[{}] {}", petition.id, petition.title);
    let _ = writeln!(out, "  {}", petition.text);

    if let Some(owner) = &petition.petitioner {
        let _ = writeln!(out, "  By: {} <{}>", owner.full_name, owner.email);
    }

    let _ = writeln!(out, "  Status: {}", petition.status);
    let _ = writeln!(out, "  Signatures: {}", petition.signatures.len());
}

pub fn render_petitioner_dashboard(petitions: &[PetitionView], user_id: &str) -> String {
    let mut out = render_chart(counts(petitions));

    out.push_str("\nAll Petitions\n");
    if petitions.is_empty() {
        out.push_str("  (none yet)\n");
    }
    for petition in petitions {
        render_card(&mut out, petition);
    }

    out.push_str("\nSign Open Petitions\n");
    let open: Vec<_> = petitions.iter().filter(|p| p.is_open()).collect();
    if open.is_empty() {
        out.push_str("  (no open petitions)\n");
    }
    for petition in open {
        let action = if petition.signed_by(user_id) {
            "already signed".to_string()
        } else {
            format!("sign with: petition-cli sign {}", petition.id)
        };

        let _ = writeln!(out, "[{}] {} ({action})", petition.id, petition.title);
    }

    out
}

pub fn render_admin_dashboard(petitions: &[PetitionView]) -> String {
    let mut out = String::from("Admin Dashboard\n");

    if petitions.is_empty() {
        out.push_str("  (no petitions)\n");
    }

    for petition in petitions {
        render_card(&mut out, petition);

        match (&petition.status, &petition.response) {
            (Status::Closed, Some(response)) => {
                let _ = writeln!(out, "  Response: {response}");
            }
            (Status::Open, _) => {
                let _ = writeln!(
                    out,
                    "  Respond with: petition-cli respond {} \"<text>\"",
                    petition.id
                );
            }
            (Status::Closed, None) => {}
        }
    }

    out
}
