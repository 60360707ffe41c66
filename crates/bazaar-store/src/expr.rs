//! Typed conditions, update actions and transactional write operations.
//!
//! The DynamoDB backend renders these into expression strings; the embedded
//! backends evaluate them in process through [`plan_writes`].

use std::collections::BTreeSet;

use crate::error::{CancellationReason, Result, TableError};
use crate::item::{AttrValue, Item, Key};

/// A condition on the current state of an item.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Condition {
    /// `attribute_exists(name)`
    AttributeExists(String),
    /// `attribute_not_exists(name)`
    AttributeNotExists(String),
    /// `name = value`
    Equals(String, AttrValue),
    /// `name > value`
    GreaterThan(String, AttrValue),
    /// Both conditions hold.
    And(Box<Condition>, Box<Condition>),
}

impl Condition {
    /// `attribute_exists(name)`
    #[must_use]
    pub fn exists(name: &str) -> Self {
        Self::AttributeExists(name.to_string())
    }

    /// `attribute_not_exists(name)`
    #[must_use]
    pub fn not_exists(name: &str) -> Self {
        Self::AttributeNotExists(name.to_string())
    }

    /// `name = value`
    #[must_use]
    pub fn equals(name: &str, value: impl Into<AttrValue>) -> Self {
        Self::Equals(name.to_string(), value.into())
    }

    /// `name > value`
    #[must_use]
    pub fn greater_than(name: &str, value: impl Into<AttrValue>) -> Self {
        Self::GreaterThan(name.to_string(), value.into())
    }

    /// `self AND other`
    #[must_use]
    pub fn and(self, other: Self) -> Self {
        Self::And(Box::new(self), Box::new(other))
    }

    /// Evaluate against the current item, `None` when it does not exist.
    ///
    /// Comparisons against a missing attribute, or across types, are false.
    #[must_use]
    pub fn evaluate(&self, item: Option<&Item>) -> bool {
        let lookup = |name: &str| item.and_then(|i| i.get(name));
        match self {
            Self::AttributeExists(name) => lookup(name).is_some(),
            Self::AttributeNotExists(name) => lookup(name).is_none(),
            Self::Equals(name, value) => lookup(name) == Some(value),
            Self::GreaterThan(name, value) => match (lookup(name), value) {
                (Some(AttrValue::N(a)), AttrValue::N(b)) => a > b,
                (Some(AttrValue::S(a)), AttrValue::S(b)) => a > b,
                _ => false,
            },
            Self::And(a, b) => a.evaluate(item) && b.evaluate(item),
        }
    }
}

/// One clause of an update.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UpdateAction {
    /// `SET name = value`
    Set(String, AttrValue),
    /// `ADD name delta`; a missing attribute counts as zero.
    Add(String, i64),
}

impl UpdateAction {
    /// `SET name = value`
    #[must_use]
    pub fn set(name: &str, value: impl Into<AttrValue>) -> Self {
        Self::Set(name.to_string(), value.into())
    }

    /// `ADD name delta`
    #[must_use]
    pub fn add(name: &str, delta: i64) -> Self {
        Self::Add(name.to_string(), delta)
    }

    fn apply(&self, item: &mut Item) -> std::result::Result<(), String> {
        match self {
            Self::Set(name, value) => item.insert(name, value.clone()),
            Self::Add(name, delta) => {
                let current = match item.get(name) {
                    None => 0,
                    Some(AttrValue::N(n)) => *n,
                    Some(AttrValue::S(_)) => return Err(format!("ADD on string attribute {name}")),
                };
                let next = current
                    .checked_add(*delta)
                    .ok_or_else(|| format!("ADD overflows {name}"))?;
                item.insert(name, next);
            }
        }
        Ok(())
    }
}

/// One operation of a transactional write.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WriteOp {
    /// Replace the item at its key.
    Put {
        /// Full item, key attributes included.
        item: Item,
        /// Must hold against the current item.
        condition: Option<Condition>,
    },
    /// Modify (or create) the item at `key`.
    Update {
        /// Target key.
        key: Key,
        /// Clauses applied in order.
        actions: Vec<UpdateAction>,
        /// Must hold against the current item.
        condition: Option<Condition>,
    },
    /// Remove the item at `key`.
    Delete {
        /// Target key.
        key: Key,
        /// Must hold against the current item.
        condition: Option<Condition>,
    },
}

impl WriteOp {
    /// The key this operation targets.
    ///
    /// # Errors
    ///
    /// Returns `TableError::Decode` for a put whose item lacks key attributes.
    pub fn key(&self) -> Result<Key> {
        match self {
            Self::Put { item, .. } => item.key(),
            Self::Update { key, .. } | Self::Delete { key, .. } => Ok(key.clone()),
        }
    }

    /// The operation's condition, if any.
    #[must_use]
    pub const fn condition(&self) -> Option<&Condition> {
        match self {
            Self::Put { condition, .. }
            | Self::Update { condition, .. }
            | Self::Delete { condition, .. } => condition.as_ref(),
        }
    }
}

/// A resolved write, ready to be applied by an embedded backend.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum Mutation {
    Put(Key, Item),
    Delete(Key),
}

/// Check every condition of a transaction and compute the resulting writes.
///
/// `current` reads the present state of a key. The caller must hold its write
/// lock for the whole plan-and-apply sequence. Nothing is written when any
/// condition fails; the error then carries one reason per operation.
pub(crate) fn plan_writes<F>(ops: Vec<WriteOp>, mut current: F) -> Result<Vec<Mutation>>
where
    F: FnMut(&Key) -> Result<Option<Item>>,
{
    let mut seen = BTreeSet::new();
    let mut reasons = Vec::with_capacity(ops.len());
    let mut mutations = Vec::with_capacity(ops.len());
    let mut failed = false;

    for op in ops {
        let key = op.key()?;
        if !seen.insert(key.clone()) {
            return Err(TableError::Backend(format!(
                "transaction targets {key} more than once"
            )));
        }

        let existing = current(&key)?;
        let reason = match resolve(op, key, existing) {
            Ok(mutation) => {
                mutations.push(mutation);
                CancellationReason::None
            }
            Err(reason) => {
                failed = true;
                reason
            }
        };
        reasons.push(reason);
    }

    if failed {
        return Err(TableError::TransactionCanceled { reasons });
    }
    Ok(mutations)
}

fn resolve(
    op: WriteOp,
    key: Key,
    existing: Option<Item>,
) -> std::result::Result<Mutation, CancellationReason> {
    if let Some(condition) = op.condition() {
        if !condition.evaluate(existing.as_ref()) {
            return Err(CancellationReason::ConditionalCheckFailed);
        }
    }
    match op {
        WriteOp::Put { item, .. } => Ok(Mutation::Put(key, item)),
        WriteOp::Delete { .. } => Ok(Mutation::Delete(key)),
        WriteOp::Update { actions, .. } => {
            let mut item = existing.unwrap_or_else(|| Item::from_key(&key));
            for action in &actions {
                action.apply(&mut item).map_err(CancellationReason::Other)?;
            }
            Ok(Mutation::Put(key, item))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::attr;

    fn counter(count: i64) -> Item {
        Item::from_key(&Key::new(-2, "Sports")).with(attr::CATEGORY_COUNT, count)
    }

    #[test]
    fn conditions() {
        let item = counter(2);
        assert!(Condition::exists(attr::CATEGORY_COUNT).evaluate(Some(&item)));
        assert!(Condition::not_exists(attr::LISTING_ID).evaluate(None));
        assert!(!Condition::not_exists(attr::LISTING_ID).evaluate(Some(&item)));
        assert!(Condition::greater_than(attr::CATEGORY_COUNT, 0).evaluate(Some(&item)));
        assert!(!Condition::greater_than(attr::CATEGORY_COUNT, 0).evaluate(Some(&counter(0))));
        assert!(!Condition::greater_than(attr::CATEGORY_COUNT, 0).evaluate(None));
        assert!(!Condition::greater_than(attr::CATEGORY_COUNT, "0").evaluate(Some(&item)));
        assert!(Condition::equals(attr::USERNAME, "Sports")
            .and(Condition::equals(attr::LISTING_ID, -2))
            .evaluate(Some(&item)));
    }

    #[test]
    fn update_creates_missing_item() {
        let key = Key::new(-2, "Sports");
        let ops = vec![WriteOp::Update {
            key: key.clone(),
            actions: vec![
                UpdateAction::set(attr::CATEGORY, "Sports"),
                UpdateAction::add(attr::CATEGORY_COUNT, 1),
            ],
            condition: None,
        }];
        let planned = plan_writes(ops, |_| Ok(None)).unwrap();
        assert_eq!(
            planned,
            vec![Mutation::Put(
                key,
                counter(1).with(attr::CATEGORY, "Sports")
            )]
        );
    }

    #[test]
    fn failed_condition_cancels_everything() {
        let ops = vec![
            WriteOp::Put {
                item: Item::from_key(&Key::new(100_001, "alice")),
                condition: Some(Condition::not_exists(attr::LISTING_ID)),
            },
            WriteOp::Update {
                key: Key::new(-2, "Sports"),
                actions: vec![UpdateAction::add(attr::CATEGORY_COUNT, -1)],
                condition: Some(Condition::greater_than(attr::CATEGORY_COUNT, 0)),
            },
        ];
        let err = plan_writes(ops, |_| Ok(None)).unwrap_err();
        match err {
            TableError::TransactionCanceled { reasons } => assert_eq!(
                reasons,
                vec![
                    CancellationReason::None,
                    CancellationReason::ConditionalCheckFailed
                ]
            ),
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn duplicate_keys_rejected() {
        let key = Key::new(100_001, "alice");
        let ops = vec![
            WriteOp::Delete {
                key: key.clone(),
                condition: None,
            },
            WriteOp::Delete {
                key,
                condition: None,
            },
        ];
        assert!(matches!(
            plan_writes(ops, |_| Ok(None)),
            Err(TableError::Backend(_))
        ));
    }
}
