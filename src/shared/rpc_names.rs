//! RPC and push names
//!
//! Canonical names of every RPC the server registers and every push the
//! server emits. The router lowercases names before lookup, so the casing
//! here only matters for what is written on the wire.

/// Liveness check answered by the transport itself
pub const PING: &str = "ping?";

// Unauthenticated
pub const AUTH: &str = "auth";
pub const SIGNUP: &str = "signup";
pub const LOGIN: &str = "login";
pub const RESET_PASSWORD: &str = "resetPassword";
pub const VALIDATE_INVITE_CODE: &str = "validateInviteCode";
pub const VALIDATE_USERNAME: &str = "validateUsername";
pub const ADD_TO_WAITLIST: &str = "addToWaitlist";

// Authenticated
pub const LOGOUT: &str = "logout";
pub const GET_CARDS: &str = "getCards";
pub const REACT_TO_CARD: &str = "reactToCard";
pub const VOTE_ON_CARD: &str = "voteOnCard";
pub const POST_CARD: &str = "postCard";
pub const NEW_INVITE: &str = "newInvite";
pub const GET_CARD: &str = "getCard";
pub const GET_THREAD: &str = "getThread";
pub const REGISTER_DEVICE: &str = "registerDevice";
pub const UNREGISTER_DEVICE: &str = "unregisterDevice";
pub const UPDATE_SETTINGS: &str = "updateSettings";
pub const GET_USER: &str = "getUser";
pub const GET_NOTIFICATIONS: &str = "getNotifications";
pub const UPDATE_NOTIFICATIONS: &str = "updateNotifications";
pub const GET_ANONYMOUS_HANDLE: &str = "getAnonymousHandle";
pub const DELETE_CARD: &str = "deleteCard";
pub const FOLLOW_USER: &str = "followUser";
pub const UNFOLLOW_USER: &str = "unfollowUser";
pub const GET_FOLLOWING_USERS: &str = "getFollowingUsers";
pub const GET_POSTS_FOR_USER: &str = "getPostsForUser";
pub const GET_TAGS: &str = "getTags";
pub const GET_FEATURES_FOR_USER: &str = "getFeaturesForUser";
pub const PREVIEW_CONTENT: &str = "previewContent";
pub const UPLOAD_IMAGE: &str = "uploadImage";
pub const GET_TAGGABLE_USERS: &str = "getTaggableUsers";
pub const MODIFY_CARD_SCORE: &str = "modifyCardScore";
pub const GET_INVITES: &str = "getInvites";
pub const GET_ONBOARDING_DATA: &str = "getOnboardingData";
pub const GET_MY_NETWORK: &str = "getMyNetwork";
pub const SUBSCRIBE_TO_CARD: &str = "subscribeToCard";
pub const UNSUBSCRIBE_FROM_CARD: &str = "unsubscribeFromCard";
pub const GROUP_INVITES: &str = "groupInvites";
pub const REPORT_CARD: &str = "reportCard";
pub const BLOCK_USER: &str = "blockUser";
pub const GET_CHANNELS: &str = "getChannels";
pub const GET_CARDS_FOR_CHANNEL: &str = "getCardsForChannel";
pub const UPDATE_CHANNEL_SUBSCRIPTION: &str = "updateChannelSubscription";
pub const JOIN_CHANNEL: &str = "joinChannel";
pub const LEAVE_CHANNEL: &str = "leaveChannel";
pub const MUTE_CHANNEL: &str = "muteChannel";
pub const UNMUTE_CHANNEL: &str = "unmuteChannel";
pub const MUTE_USER: &str = "muteUser";
pub const UNMUTE_USER: &str = "unmuteUser";
pub const MUTE_THREAD: &str = "muteThread";
pub const UNMUTE_THREAD: &str = "unmuteThread";
pub const CREATE_CHANNEL: &str = "createChannel";
pub const GET_POPULAR_CARDS: &str = "getPopularCards";
pub const VALIDATE_CHANNEL_NAME: &str = "validateChannelName";
pub const GET_CHANNEL: &str = "getChannel";
pub const GET_ACTION_COSTS: &str = "getActionCosts";
pub const USE_INVITE_CODE: &str = "useInviteCode";
pub const REQUEST_VALIDATION: &str = "requestValidation";
pub const CONFIRM_VALIDATION: &str = "confirmValidation";
pub const CAN_AFFORD_ANONYMOUS_POST: &str = "canAffordAnonymousPost";
pub const GET_LEADERBOARD: &str = "getLeaderboard";
pub const SUBMIT_FEEDBACK: &str = "submitFeedback";
pub const TIP_CARD: &str = "tipCard";

// Admin panel
pub const NEW_USER: &str = "newUser";
pub const GET_USERS: &str = "getUsers";
pub const CONNECT_USERS: &str = "connectUsers";

/// Server to client push names.
pub mod push {
    pub const NEW_CARD: &str = "newCard";
    pub const UPDATE_CARD: &str = "updateCard";
    pub const DELETE_CARD: &str = "deleteCard";
    pub const NEW_NOTIFICATION: &str = "newNotification";
    pub const UPDATE_NOTIFICATION: &str = "updateNotification";
    pub const UPDATE_USER: &str = "updateUser";
    pub const UPDATE_ENGAGEMENT: &str = "updateEngagement";
    pub const UPDATE_COIN_BALANCE: &str = "updateCoinBalance";

    /// Sent after a connection presented an unknown session.
    pub const LOGOUT: &str = "logout";

    /// Sent right before a non-admin connection is closed for maintenance.
    /// The spelling is what deployed clients listen for.
    pub const MAINTENANCE_MODE: &str = "maintainanceMode";
}
