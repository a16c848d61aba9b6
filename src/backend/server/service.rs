/**
 * RPC Service
 *
 * The domain side of every registered RPC. The transport owns dispatch,
 * guards and framing; the service owns what a request means.
 *
 * A deployment supplies one `RpcService`. Each registered RPC forwards to
 * `call` with its lowercased name, after the RPC's guards passed.
 */

use async_trait::async_trait;
use std::sync::Arc;

use crate::backend::error::BackendError;
use crate::backend::middleware::rpc::{authenticate, deauthenticate, rate_limit, require_admin, require_user};
use crate::backend::protocol::{endpoint, ConnectionRegistry, Endpoint, Reply, RpcRequest, Router};
use crate::shared::rpc_names::*;

/// Domain implementation behind the RPC table
#[async_trait]
pub trait RpcService: Send + Sync {
    /// Handle `rpc` (lowercased).
    ///
    /// Login-like RPCs return the new session through [`Reply::with_session`].
    async fn call(&self, rpc: &str, request: RpcRequest) -> Result<Reply, BackendError>;
}

/// Service that answers every RPC with an error
#[derive(Debug, Default, Clone, Copy)]
pub struct UnimplementedService;

#[async_trait]
impl RpcService for UnimplementedService {
    async fn call(&self, rpc: &str, _request: RpcRequest) -> Result<Reply, BackendError> {
        Err(BackendError::handler(format!("RPC {} is not implemented", rpc)))
    }
}

/// Login-like RPCs; a returned session is bound to the connection
const AUTH_RPCS: &[&str] = &[SIGNUP, LOGIN, AUTH];

const PUBLIC_RPCS: &[&str] = &[
    RESET_PASSWORD,
    VALIDATE_USERNAME,
    ADD_TO_WAITLIST,
    GET_CARD,
    GET_THREAD,
    GET_USER,
    GET_POSTS_FOR_USER,
    GET_TAGS,
    GET_FEATURES_FOR_USER,
];

const ADMIN_RPCS: &[&str] = &[MODIFY_CARD_SCORE, GROUP_INVITES, NEW_USER, GET_USERS, CONNECT_USERS];

const USER_RPCS: &[&str] = &[
    GET_CARDS,
    REACT_TO_CARD,
    VOTE_ON_CARD,
    POST_CARD,
    NEW_INVITE,
    REGISTER_DEVICE,
    UNREGISTER_DEVICE,
    UPDATE_SETTINGS,
    GET_NOTIFICATIONS,
    UPDATE_NOTIFICATIONS,
    GET_ANONYMOUS_HANDLE,
    DELETE_CARD,
    FOLLOW_USER,
    UNFOLLOW_USER,
    GET_FOLLOWING_USERS,
    PREVIEW_CONTENT,
    UPLOAD_IMAGE,
    GET_TAGGABLE_USERS,
    GET_INVITES,
    GET_ONBOARDING_DATA,
    GET_MY_NETWORK,
    SUBSCRIBE_TO_CARD,
    UNSUBSCRIBE_FROM_CARD,
    REPORT_CARD,
    BLOCK_USER,
    GET_CHANNELS,
    GET_CARDS_FOR_CHANNEL,
    UPDATE_CHANNEL_SUBSCRIPTION,
    JOIN_CHANNEL,
    LEAVE_CHANNEL,
    MUTE_CHANNEL,
    UNMUTE_CHANNEL,
    MUTE_USER,
    UNMUTE_USER,
    MUTE_THREAD,
    UNMUTE_THREAD,
    CREATE_CHANNEL,
    GET_POPULAR_CARDS,
    VALIDATE_CHANNEL_NAME,
    GET_CHANNEL,
    GET_ACTION_COSTS,
    USE_INVITE_CODE,
    REQUEST_VALIDATION,
    CONFIRM_VALIDATION,
    CAN_AFFORD_ANONYMOUS_POST,
    GET_LEADERBOARD,
    SUBMIT_FEEDBACK,
    TIP_CARD,
];

fn forward(service: &Arc<dyn RpcService>, rpc: &str) -> Endpoint {
    let service = Arc::clone(service);
    let rpc = rpc.to_lowercase();
    endpoint(move |request| {
        let service = Arc::clone(&service);
        let rpc = rpc.clone();
        async move { service.call(&rpc, request).await }
    })
}

/// Register every RPC with its guards.
///
/// # Arguments
///
/// * `router` - Router to register into
/// * `registry` - Registry the auth middlewares bind sessions in
/// * `service` - Domain implementation
/// * `unauthenticated_rate_limit` - Tokens per second for rate-limited RPCs
pub fn register_rpcs(
    router: &mut Router,
    registry: &Arc<ConnectionRegistry>,
    service: &Arc<dyn RpcService>,
    unauthenticated_rate_limit: u32,
) {
    router.register_rpc(PING, endpoint(|_| async { Reply::new("Pong!") }));

    for rpc in AUTH_RPCS {
        router.register_rpc(rpc, authenticate(Arc::clone(registry), forward(service, rpc)));
    }
    for rpc in PUBLIC_RPCS {
        router.register_rpc(rpc, forward(service, rpc));
    }
    for rpc in USER_RPCS {
        router.register_rpc(rpc, require_user(forward(service, rpc)));
    }
    for rpc in ADMIN_RPCS {
        router.register_rpc(rpc, require_admin(forward(service, rpc)));
    }

    router.register_rpc(
        LOGOUT,
        deauthenticate(Arc::clone(registry), require_user(forward(service, LOGOUT))),
    );

    let rate = std::num::NonZeroU32::new(unauthenticated_rate_limit).unwrap_or(std::num::NonZeroU32::MIN);
    let limiter = Arc::new(governor::RateLimiter::direct(governor::Quota::per_second(rate)));
    router.register_rpc(VALIDATE_INVITE_CODE, rate_limit(limiter, forward(service, VALIDATE_INVITE_CODE)));
}
