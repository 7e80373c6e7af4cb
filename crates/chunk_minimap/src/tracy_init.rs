//! Tracy profiler initialization.

use tracing_subscriber::prelude::*;
use tracing_tracy::TracyLayer;

/// Routes the streaming systems' spans to Tracy.
///
/// Call once before `App::run()`; spans are only emitted with the `tracy`
/// feature enabled.
pub fn init_tracy() {
  tracing_subscriber::registry()
    .with(TracyLayer::default())
    .init();
}
