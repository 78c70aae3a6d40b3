use tracing::{debug, warn};

use crate::{Block, ValidationError};

/// Walk the chain from index 1 and stop at the first block whose stored hash
/// differs from its recomputed digest or whose previous hash does not match
/// its predecessor. The genesis block is not mined and is never checked.
pub fn validate_chain(chain: &[Block]) -> Result<(), ValidationError> {
    for (index, pair) in chain.windows(2).enumerate().map(|(i, w)| (i + 1, w)) {
        let (previous, current) = (&pair[0], &pair[1]);

        let computed = current.compute_hash();
        if current.hash != computed {
            let err = ValidationError::HashMismatch {
                index,
                stored: current.hash,
                computed,
            };
            warn!(%err, "chain invalid");
            return Err(err);
        }

        if current.previous_hash != previous.hash {
            let err = ValidationError::BrokenLink {
                index,
                expected: previous.hash,
                found: current.previous_hash,
            };
            warn!(%err, "chain invalid");
            return Err(err);
        }
    }
    debug!(blocks = chain.len(), "chain valid");
    Ok(())
}
