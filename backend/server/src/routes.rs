use std::{collections::HashMap, sync::Arc};

use axum::{
    Extension, Json,
    extract::{
        Path, Query, State,
        rejection::{JsonRejection, QueryRejection},
    },
    http::StatusCode,
    response::IntoResponse,
};
use payloads::{
    Claims, CreatePetitionRequest, CreatedPetitionResponse, LoginRequest, LoginResponse,
    MessageResponse, PetitionView, PetitionsResponse, RegisterRequest, RespondRequest, Role,
};
use serde::Deserialize;
use tracing::info;

use crate::{
    auth::{hash_password, issue_token, verify_password},
    error::AppError,
    models::{CloseOutcome, InsertOutcome, Petition, SignOutcome, User},
    state::AppState,
    utils::{
        json_body, normalize_email, parse_status_filter, query_params, validate_petition,
        validate_registration, validate_response,
    },
};

#[derive(Deserialize)]
pub struct ListQuery {
    status: Option<String>,
}

pub async fn register_handler(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<RegisterRequest>, JsonRejection>,
) -> Result<impl IntoResponse, AppError> {
    let registration = validate_registration(json_body(payload)?, &state.config.bio_ids)?;

    let password_hash = hash_password(&registration.password, state.config.hash_memory_kib)?;
    let user = User::new(
        registration.email,
        registration.full_name,
        registration.dob,
        password_hash,
        registration.bio_id,
        Role::Petitioner,
    );

    match state.store.insert_user(&user).await? {
        InsertOutcome::Inserted => {
            info!(user = %user.id, "Registered petitioner");

            Ok((
                StatusCode::CREATED,
                Json(MessageResponse::new("User registered successfully.")),
            ))
        }
        InsertOutcome::Duplicate => Err(AppError::Conflict(
            "Email or BioID already in use.".to_string(),
        )),
    }
}

pub async fn login_handler(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<LoginRequest>, JsonRejection>,
) -> Result<impl IntoResponse, AppError> {
    let request = json_body(payload)?;
    let email = normalize_email(&request.email);

    if email.is_empty() || request.password.is_empty() {
        return Err(AppError::Validation(
            "Email and password are required.".to_string(),
        ));
    }

    let user = state
        .store
        .find_user_by_email(&email)
        .await?
        .ok_or_else(|| AppError::NotFound("User not found.".to_string()))?;

    if !verify_password(&request.password, &user.password_hash)? {
        return Err(AppError::Unauthorized("Invalid credentials.".to_string()));
    }

    let token = issue_token(
        &user.id,
        user.role,
        &state.config.jwt_secret,
        state.config.token_ttl,
    )?;

    info!(user = %user.id, role = %user.role, "Login");

    Ok(Json(LoginResponse {
        token,
        message: "Login successful.".to_string(),
    }))
}

pub async fn list_petitions_handler(
    State(state): State<Arc<AppState>>,
    query: Result<Query<ListQuery>, QueryRejection>,
) -> Result<impl IntoResponse, AppError> {
    let query = query_params(query)?;
    let status = parse_status_filter(query.status.as_deref())?;
    let petitions = state.store.list_petitions(status).await?;

    Ok(Json(PetitionsResponse {
        petitions: join_petitioners(&state, petitions).await?,
    }))
}

pub async fn create_petition_handler(
    State(state): State<Arc<AppState>>,
    Extension(claims): Extension<Claims>,
    payload: Result<Json<CreatePetitionRequest>, JsonRejection>,
) -> Result<impl IntoResponse, AppError> {
    let (title, text) = validate_petition(json_body(payload)?)?;

    // Owner always comes from the token
    let petition = Petition::new(title, text, claims.user_id);
    state.store.insert_petition(&petition).await?;

    info!(petition = %petition.id, owner = %petition.petitioner, "Created petition");

    // Reply with what was stored, not what was sent
    let stored = state
        .store
        .find_petition(&petition.id)
        .await?
        .ok_or_else(|| AppError::Internal("created petition vanished".to_string()))?;

    let petition = join_petitioners(&state, vec![stored])
        .await?
        .pop()
        .ok_or_else(|| AppError::Internal("created petition vanished".to_string()))?;

    Ok((
        StatusCode::CREATED,
        Json(CreatedPetitionResponse {
            message: "Petition created successfully.".to_string(),
            petition,
        }),
    ))
}

pub async fn sign_petition_handler(
    State(state): State<Arc<AppState>>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    match state.store.sign_petition(&id, &claims.user_id).await? {
        SignOutcome::Signed => {
            info!(petition = %id, signer = %claims.user_id, "Signed petition");

            Ok(Json(MessageResponse::new("Petition signed successfully.")))
        }
        SignOutcome::AlreadySigned => Err(AppError::Conflict(
            "You have already signed this petition.".to_string(),
        )),
        SignOutcome::Closed => Err(AppError::Validation("Petition is closed.".to_string())),
        SignOutcome::NotFound => Err(AppError::NotFound("Petition not found.".to_string())),
    }
}

pub async fn admin_petitions_handler(
    State(state): State<Arc<AppState>>,
) -> Result<impl IntoResponse, AppError> {
    let petitions = state.store.list_petitions(None).await?;

    Ok(Json(PetitionsResponse {
        petitions: join_petitioners(&state, petitions).await?,
    }))
}

pub async fn respond_handler(
    State(state): State<Arc<AppState>>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<String>,
    payload: Result<Json<RespondRequest>, JsonRejection>,
) -> Result<impl IntoResponse, AppError> {
    let response = validate_response(&json_body(payload)?.response)?;

    match state.store.close_petition(&id, &response).await? {
        CloseOutcome::Closed => {
            info!(petition = %id, admin = %claims.user_id, "Closed petition");

            Ok(Json(MessageResponse::new(
                "Response added and petition closed.",
            )))
        }
        CloseOutcome::AlreadyClosed => Err(AppError::Conflict(
            "Petition is already closed.".to_string(),
        )),
        CloseOutcome::NotFound => Err(AppError::NotFound("Petition not found.".to_string())),
    }
}

pub async fn health_handler() -> impl IntoResponse {
    (StatusCode::OK, "ok")
}

pub async fn not_found_handler() -> AppError {
    AppError::NotFound("Not found.".to_string())
}

pub async fn method_not_allowed_handler() -> AppError {
    AppError::MethodNotAllowed("Method not allowed.".to_string())
}

/// Attaches each petition's owner as `{id, email, fullName}`.
async fn join_petitioners(
    state: &AppState,
    petitions: Vec<Petition>,
) -> Result<Vec<PetitionView>, AppError> {
    let mut owner_ids: Vec<String> = petitions.iter().map(|p| p.petitioner.clone()).collect();
    owner_ids.sort_unstable();
    owner_ids.dedup();

    let owners: HashMap<String, User> = state
        .store
        .find_users(&owner_ids)
        .await?
        .into_iter()
        .map(|user| (user.id.clone(), user))
        .collect();

    Ok(petitions
        .into_iter()
        .map(|petition| {
            let owner = owners.get(&petition.petitioner).map(User::as_petitioner);
            petition.into_view(owner)
        })
        .collect())
}
