use std::path::PathBuf;

use anyhow::{Result, bail};
use clap::{Parser, Subcommand};
use client::{
    AllowList, ApiClient, Route, Session, TokenStore,
    dashboard::{render_admin_dashboard, render_petitioner_dashboard},
    guard,
};
use payloads::{RegisterRequest, Status};

#[derive(Parser, Debug)]
#[command(author, version, about)]
struct Args {
    /// Server base url
    #[arg(long, env = "PETITION_API", default_value = "http://127.0.0.1:5000")]
    api: String,

    /// Where the login token is kept between runs
    #[arg(long, env = "PETITION_TOKEN_FILE", default_value = ".petition-token")]
    token_file: PathBuf,

    /// BioID allow-list replacing the built-in one, same format as the server's
    #[arg(long, env = "BIO_ID_FILE")]
    bio_id_file: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    Register {
        email: String,
        full_name: String,
        /// YYYY-MM-DD
        dob: String,
        password: String,
        bio_id: String,
    },
    Login {
        email: String,
        password: String,
    },
    Logout,
    /// Show who the stored token belongs to
    Whoami,
    /// Petitioner dashboard
    Dashboard,
    Petitions {
        /// open or closed
        #[arg(long)]
        status: Option<String>,
    },
    Create {
        title: String,
        text: String,
    },
    Sign {
        id: String,
    },
    /// Admin dashboard
    Admin,
    Respond {
        id: String,
        response: String,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let api = ApiClient::new(&args.api);
    let mut session = Session::restore(TokenStore::new(&args.token_file))?;

    match args.command {
        Command::Register {
            email,
            full_name,
            dob,
            password,
            bio_id,
        } => {
            if !AllowList::load(args.bio_id_file.as_deref())?.contains(&bio_id) {
                bail!("Invalid BioID. Please enter a valid BioID.");
            }

            let request = RegisterRequest {
                email,
                full_name,
                dob,
                password,
                bio_id,
            };

            match api.register(&request).await {
                Ok(response) => println!("{} Log in to continue.", response.message),
                Err(e) => bail!("Registration failed. {e}"),
            }
        }
        Command::Login { email, password } => {
            let response = api.login(&email, &password).await?;
            let role = session.login(response.token)?.role;

            println!("{}", response.message);
            println!("Logged in as {role}, home is {}", Route::home(role));
        }
        Command::Logout => {
            session.logout()?;
            println!("Logged out.");
        }
        Command::Whoami => match &session.state.user {
            Some(claims) => println!("{} ({})", claims.user_id, claims.role),
            None => println!("Not logged in."),
        },
        Command::Dashboard => {
            let token = enter(&session, Route::Dashboard)?;
            show_dashboard(&api, &session, token).await?;
        }
        Command::Petitions { status } => {
            let token = enter(&session, Route::Dashboard)?;
            let status = status.map(|s| s.parse::<Status>()).transpose()?;

            for petition in api.petitions(token, status).await? {
                println!(
                    "[{}] {} ({}, {} signatures)",
                    petition.id,
                    petition.title,
                    petition.status,
                    petition.signatures.len()
                );
            }
        }
        Command::Create { title, text } => {
            let token = enter(&session, Route::Dashboard)?;

            match api.create_petition(token, &title, &text).await {
                Ok(response) => println!("{}", response.message),
                Err(e) => bail!("Failed to create petition. {e}"),
            }

            show_dashboard(&api, &session, token).await?;
        }
        Command::Sign { id } => {
            let token = enter(&session, Route::Dashboard)?;

            match api.sign_petition(token, &id).await {
                Ok(response) => println!("{}", response.message),
                Err(e) => bail!("Failed to sign petition. {e}"),
            }

            show_dashboard(&api, &session, token).await?;
        }
        Command::Admin => {
            let token = enter(&session, Route::Admin)?;
            print!("{}", render_admin_dashboard(&api.admin_petitions(token).await?));
        }
        Command::Respond { id, response } => {
            let token = enter(&session, Route::Admin)?;

            match api.respond(token, &id, &response).await {
                Ok(reply) => println!("{}", reply.message),
                Err(e) => bail!("Failed to respond. {e}"),
            }

            print!("{}", render_admin_dashboard(&api.admin_petitions(token).await?));
        }
    }

    Ok(())
}

/// Token for a protected route, or an error pointing back to login.
fn enter(session: &Session, route: Route) -> Result<&str> {
    match (guard(route, &session.state), session.token()) {
        (landed, Some(token)) if landed == route => Ok(token),
        _ => bail!("{route} requires a {} login, redirecting to {}", role_name(route), Route::Login),
    }
}

fn role_name(route: Route) -> &'static str {
    route.required_role().map_or("", |role| role.as_str())
}

async fn show_dashboard(api: &ApiClient, session: &Session, token: &str) -> Result<()> {
    let petitions = api.petitions(token, None).await?;
    let user_id = session
        .state
        .user
        .as_ref()
        .map_or("", |claims| claims.user_id.as_str());

    print!("{}", render_petitioner_dashboard(&petitions, user_id));
    Ok(())
}
