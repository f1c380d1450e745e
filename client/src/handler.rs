use serde_json::Value;
use vidnote_proto::Id;

use crate::client::ConnectionState;
use crate::error::ClientError;

/// Callbacks invoked by the client's driver task.
///
/// Every method has an empty default, so implementors only override what
/// their UI shows. Calls arrive on a tokio worker thread, one at a time.
pub trait RelayHandler: Send + Sync + 'static {
    /// The relay acknowledged a join.
    fn on_joined(&self, _video_id: &Id) {}

    /// A peer in the room posted a comment.
    fn on_new_comment(&self, _comment: &Value) {}

    fn on_typing_indicator(&self, _user_id: &Id, _is_typing: bool) {}

    fn on_state_change(&self, _state: ConnectionState) {}

    fn on_error(&self, _error: &ClientError) {}
}

/// A handler that ignores everything.
impl RelayHandler for () {}
