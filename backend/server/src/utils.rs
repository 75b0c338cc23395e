use std::{collections::HashSet, sync::LazyLock};

use axum::{
    Json,
    extract::{
        Query,
        rejection::{JsonRejection, QueryRejection},
    },
};
use chrono::{NaiveDate, Utc};
use payloads::{CreatePetitionRequest, RegisterRequest, Status};
use regex::Regex;

use crate::error::AppError::{self, Validation};

static EMAIL: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").expect("email pattern compiles"));

/// Registration fields after validation. The password is still plaintext.
pub struct Registration {
    pub email: String,
    pub full_name: String,
    pub dob: NaiveDate,
    pub password: String,
    pub bio_id: String,
}

/// Maps axum's body rejection onto a validation error.
pub fn json_body<T>(payload: Result<Json<T>, JsonRejection>) -> Result<T, AppError> {
    payload
        .map(|Json(body)| body)
        .map_err(|rejection| Validation(format!("Malformed payload: {}", rejection.body_text())))
}

/// Same as [`json_body`] for query strings.
pub fn query_params<T>(query: Result<Query<T>, QueryRejection>) -> Result<T, AppError> {
    query
        .map(|Query(params)| params)
        .map_err(|rejection| Validation(format!("Malformed query: {}", rejection.body_text())))
}

pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

fn required(field: &str, value: &str) -> Result<String, AppError> {
    let value = value.trim();

    if value.is_empty() {
        return Err(Validation(format!("Missing required field: {field}")));
    }

    Ok(value.to_string())
}

pub fn validate_registration(
    request: RegisterRequest,
    bio_ids: &HashSet<String>,
) -> Result<Registration, AppError> {
    let email = normalize_email(&required("email", &request.email)?);
    let full_name = required("fullName", &request.full_name)?;
    let dob = required("dob", &request.dob)?;
    let bio_id = required("bioId", &request.bio_id)?;

    // Passwords are not trimmed
    if request.password.is_empty() {
        return Err(Validation("Missing required field: password".to_string()));
    }

    if !EMAIL.is_match(&email) {
        return Err(Validation(format!("Invalid email address: {email}")));
    }

    let dob = NaiveDate::parse_from_str(&dob, "%Y-%m-%d")
        .map_err(|_| Validation(format!("Invalid date of birth: {dob}, expected YYYY-MM-DD")))?;

    if dob > Utc::now().date_naive() {
        return Err(Validation("Date of birth is in the future.".to_string()));
    }

    if !bio_ids.contains(&bio_id) {
        return Err(Validation("Invalid BioID.".to_string()));
    }

    Ok(Registration {
        email,
        full_name,
        dob,
        password: request.password,
        bio_id,
    })
}

pub fn validate_petition(request: CreatePetitionRequest) -> Result<(String, String), AppError> {
    Ok((
        required("title", &request.title)?,
        required("text", &request.text)?,
    ))
}

pub fn validate_response(response: &str) -> Result<String, AppError> {
    required("response", response)
}

/// Absent or empty means no filter.
pub fn parse_status_filter(status: Option<&str>) -> Result<Option<Status>, AppError> {
    match status.map(str::trim) {
        None | Some("") => Ok(None),
        Some(raw) => raw.parse().map(Some).map_err(|_| {
            Validation(format!("Invalid status filter '{raw}', expected open or closed"))
        }),
    }
}
