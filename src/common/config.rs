//! Default configuration values.

use std::time::Duration;

/// Number of connections a pool keeps when no size is configured.
pub const DEFAULT_POOL_SIZE: usize = 10;

/// Claim timeout used until a login timeout is set on the data source.
pub const DEFAULT_CLAIM_TIMEOUT: Duration = Duration::from_secs(30);

/// Maximum age of a pooled connection under the default expiration policy.
pub const DEFAULT_MAX_AGE: Duration = Duration::from_secs(10 * 60);
