use lasso::{Spur, ThreadedRodeo};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::sync::LazyLock;

/// Process-wide interner backing every [`NodeId`].
static INTERNER: LazyLock<ThreadedRodeo> = LazyLock::new(ThreadedRodeo::default);

/// Interned node identifier. Copying and comparing never touch the string.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct NodeId(Spur);

impl NodeId {
    /// Intern a string as a NodeId, or return the existing one.
    pub fn intern(s: &str) -> Self {
        NodeId(INTERNER.get_or_intern(s))
    }

    /// Resolve back to a string slice.
    pub fn as_str(&self) -> &str {
        INTERNER.resolve(&self.0)
    }

    /// Numeric value of the id, if it was produced by a counter.
    pub fn as_counter(&self) -> Option<u64> {
        self.as_str().parse().ok()
    }
}

impl fmt::Debug for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.as_str())
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for NodeId {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for NodeId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Ok(NodeId::intern(&s))
    }
}

// ─── Id generation ───────────────────────────────────────────────────────

/// How new node ids are minted.
///
/// Counter ids are stable and human readable but only unique within one
/// store; uuid ids survive merging snapshots from different sessions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IdStrategy {
    #[default]
    Uuid,
    Counter,
}

/// Mints node ids according to an [`IdStrategy`].
#[derive(Debug, Clone)]
pub struct IdGenerator {
    strategy: IdStrategy,
    next: u64,
}

impl IdGenerator {
    pub fn new(strategy: IdStrategy) -> Self {
        Self { strategy, next: 1 }
    }

    pub fn strategy(&self) -> IdStrategy {
        self.strategy
    }

    /// Produce a fresh id.
    pub fn next_id(&mut self) -> NodeId {
        match self.strategy {
            IdStrategy::Uuid => NodeId::intern(&uuid::Uuid::new_v4().to_string()),
            IdStrategy::Counter => {
                let n = self.next;
                self.next += 1;
                NodeId::intern(&n.to_string())
            }
        }
    }

    /// Record an id that entered the store from outside (import), so the
    /// counter never hands it out again.
    pub fn observe(&mut self, id: NodeId) {
        if let Some(n) = id.as_counter()
            && n >= self.next
        {
            self.next = n + 1;
        }
    }

    /// Restart the counter (used when the whole graph is cleared).
    pub fn reset(&mut self) {
        self.next = 1;
    }
}

impl Default for IdGenerator {
    fn default() -> Self {
        Self::new(IdStrategy::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn interning_roundtrip() {
        let a = NodeId::intern("telegram");
        let b = NodeId::intern("telegram");
        assert_eq!(a, b);
        assert_eq!(a.as_str(), "telegram");
    }

    #[test]
    fn uuid_ids_are_unique() {
        let mut ids = IdGenerator::new(IdStrategy::Uuid);
        let a = ids.next_id();
        let b = ids.next_id();
        assert_ne!(a, b);
        assert_eq!(a.as_str().len(), 36);
    }

    #[test]
    fn counter_is_monotonic() {
        let mut ids = IdGenerator::new(IdStrategy::Counter);
        assert_eq!(ids.next_id().as_str(), "1");
        assert_eq!(ids.next_id().as_str(), "2");
    }

    #[test]
    fn counter_skips_observed_ids() {
        let mut ids = IdGenerator::new(IdStrategy::Counter);
        ids.observe(NodeId::intern("41"));
        ids.observe(NodeId::intern("not-a-number"));
        ids.observe(NodeId::intern("7"));
        assert_eq!(ids.next_id().as_str(), "42");
    }
}
