//! `ping`: backend-independent by default (§4.7). A future
//! `GatewayConfig` knob could tie it to backend liveness; nothing in this
//! spec's scope requires that, so it always answers from the pool's
//! perspective alone.
use bytes::Bytes;

use crate::error::CommandError;

use super::reply::simple_ok;
use super::Context;

pub async fn execute(_ctx: &Context<'_>) -> Result<Bytes, CommandError> {
    simple_ok()
}
