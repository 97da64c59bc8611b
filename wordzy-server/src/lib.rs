use serde::{Deserialize, Serialize};
use std::sync::Arc;
use warp::Filter;
use warp::http::StatusCode;

use crate::auth::{AuthService, bearer_token};
use crate::config::Config;
use crate::room_manager::RoomManager;
use crate::websocket::ConnectionManager;
use wordzy_types::{GameError, Player, RoomId, RoomSnapshot};

pub mod auth;
pub mod config;
pub mod room_manager;
pub mod transport;
pub mod websocket;

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JoinRoomRequest {
    pub room_id: RoomId,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoomIdResponse {
    pub room_id: RoomId,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct RoomResponse {
    pub room: RoomSnapshot,
}

type JsonReply = warp::reply::WithStatus<warp::reply::Json>;

pub fn create_routes(
    connection_manager: Arc<ConnectionManager>,
    room_manager: Arc<RoomManager>,
    auth_service: Arc<AuthService>,
    config: Arc<Config>,
) -> impl Filter<Extract = impl warp::Reply, Error = warp::Rejection> + Clone {
    let connection_manager_filter = warp::any().map({
        let connection_manager = connection_manager.clone();
        move || connection_manager.clone()
    });

    let room_manager_filter = warp::any().map({
        let room_manager = room_manager.clone();
        move || room_manager.clone()
    });

    let auth_filter = warp::any().map({
        let auth_service = auth_service.clone();
        move || auth_service.clone()
    });

    let config_filter = warp::any().map({
        let config = config.clone();
        move || config.clone()
    });

    // WebSocket endpoint
    let websocket = warp::path("ws")
        .and(warp::ws())
        .and(connection_manager_filter)
        .and(room_manager_filter.clone())
        .and(auth_filter.clone())
        .and(config_filter)
        .map(|ws: warp::ws::Ws, conn_mgr, room_mgr, auth, config| {
            ws.on_upgrade(move |socket| {
                websocket::handle_connection(socket, conn_mgr, room_mgr, auth, config)
            })
        });

    // Health check endpoint
    let health = warp::path("health")
        .and(warp::get())
        .map(|| warp::reply::with_status("OK", StatusCode::OK));

    let create_room = warp::path!("rooms" / "create")
        .and(warp::post())
        .and(warp::header::optional::<String>("authorization"))
        .and(room_manager_filter.clone())
        .and(auth_filter.clone())
        .and_then(handle_create_room);

    let join_room = warp::path!("rooms" / "join")
        .and(warp::post())
        .and(warp::header::optional::<String>("authorization"))
        .and(warp::body::content_length_limit(4 * 1024))
        .and(warp::body::json::<JoinRoomRequest>())
        .and(room_manager_filter.clone())
        .and(auth_filter.clone())
        .and_then(handle_join_room);

    let get_room = warp::path!("rooms" / String)
        .and(warp::get())
        .and(warp::header::optional::<String>("authorization"))
        .and(room_manager_filter)
        .and(auth_filter)
        .and_then(handle_get_room);

    // CORS configuration
    let cors = warp::cors()
        .allow_any_origin()
        .allow_headers(vec!["content-type", "authorization"])
        .allow_methods(vec!["GET", "POST"]);

    websocket
        .or(health)
        .or(create_room)
        .or(join_room)
        .or(get_room)
        .with(cors)
        .with(warp::log("wordzy"))
}

fn error_reply(error: &GameError) -> JsonReply {
    let status = match error {
        GameError::AuthenticationFailure { .. } => StatusCode::UNAUTHORIZED,
        GameError::RoomNotFound { .. } => StatusCode::NOT_FOUND,
        GameError::RoomFull { .. } => StatusCode::CONFLICT,
        GameError::NotOwner => StatusCode::FORBIDDEN,
        _ => StatusCode::BAD_REQUEST,
    };
    warp::reply::with_status(
        warp::reply::json(&serde_json::json!({ "error": error.to_string() })),
        status,
    )
}

async fn authenticate(
    auth_header: Option<String>,
    auth_service: &AuthService,
) -> Result<Player, GameError> {
    let token = bearer_token(auth_header.as_deref())
        .ok_or_else(|| GameError::authentication("missing bearer token"))?;
    Ok(auth_service.validate_token(token).await?)
}

async fn handle_create_room(
    auth_header: Option<String>,
    room_manager: Arc<RoomManager>,
    auth_service: Arc<AuthService>,
) -> Result<JsonReply, warp::Rejection> {
    let result = async {
        let player = authenticate(auth_header, &auth_service).await?;
        room_manager.create_room(player).await
    }
    .await;

    Ok(match result {
        Ok(room_id) => warp::reply::with_status(
            warp::reply::json(&RoomIdResponse { room_id }),
            StatusCode::CREATED,
        ),
        Err(e) => error_reply(&e),
    })
}

async fn handle_join_room(
    auth_header: Option<String>,
    request: JoinRoomRequest,
    room_manager: Arc<RoomManager>,
    auth_service: Arc<AuthService>,
) -> Result<JsonReply, warp::Rejection> {
    let result = async {
        let player = authenticate(auth_header, &auth_service).await?;
        room_manager.join(&request.room_id, player).await
    }
    .await;

    Ok(match result {
        Ok(room) => warp::reply::with_status(
            warp::reply::json(&RoomIdResponse { room_id: room.id }),
            StatusCode::OK,
        ),
        Err(e) => error_reply(&e),
    })
}

async fn handle_get_room(
    room_id: String,
    auth_header: Option<String>,
    room_manager: Arc<RoomManager>,
    auth_service: Arc<AuthService>,
) -> Result<JsonReply, warp::Rejection> {
    if let Err(e) = authenticate(auth_header, &auth_service).await {
        return Ok(error_reply(&e));
    }

    Ok(match room_manager.snapshot(&room_id).await {
        Some(room) => warp::reply::with_status(
            warp::reply::json(&RoomResponse { room }),
            StatusCode::OK,
        ),
        None => error_reply(&GameError::RoomNotFound { room_id }),
    })
}
