use std::time::Duration;

use oas_stub_sdk::ApiDelay;

/// Time still owed to the delay policy after `elapsed` of processing.
/// Never negative: an overrun yields zero.
#[must_use]
pub fn remaining_delay(delay: &ApiDelay, elapsed: Duration) -> Duration {
    delay.target().saturating_sub(elapsed)
}
