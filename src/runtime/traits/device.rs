//! Trait for device identification

/// Trait for device identification
///
/// Matrix views record the id of the device their memory lives on; every
/// operation compares it against the id of the dispatching client.
pub trait Device: Clone + Send + Sync + 'static {
    /// Unique identifier for this device within its runtime
    fn id(&self) -> usize;

    /// Check if two devices are the same
    fn is_same(&self, other: &Self) -> bool {
        self.id() == other.id()
    }

    /// Human-readable name
    fn name(&self) -> String {
        format!("device:{}", self.id())
    }
}
