//! Rendering typed conditions and updates into DynamoDB expressions.
//!
//! Every attribute name goes through a `#nN` placeholder and every value
//! through a `:vN` placeholder, so reserved words need no special casing.

use std::collections::HashMap;

use aws_sdk_dynamodb::types::AttributeValue;

use super::to_attribute;
use crate::expr::{Condition, UpdateAction};
use crate::item::AttrValue;
use crate::query::{Query, SortKeyCondition};

/// Placeholder maps for one request.
#[derive(Debug, Default)]
pub(crate) struct Expression {
    names: HashMap<String, String>,
    values: HashMap<String, AttributeValue>,
}

impl Expression {
    fn name(&mut self, attribute: &str) -> String {
        if let Some((placeholder, _)) = self.names.iter().find(|(_, a)| *a == attribute) {
            return placeholder.clone();
        }
        let placeholder = format!("#n{}", self.names.len());
        self.names.insert(placeholder.clone(), attribute.to_string());
        placeholder
    }

    fn value(&mut self, value: &AttrValue) -> String {
        let placeholder = format!(":v{}", self.values.len());
        self.values.insert(placeholder.clone(), to_attribute(value));
        placeholder
    }

    /// Render a condition expression.
    pub(crate) fn condition(&mut self, condition: &Condition) -> String {
        match condition {
            Condition::AttributeExists(name) => {
                format!("attribute_exists({})", self.name(name))
            }
            Condition::AttributeNotExists(name) => {
                format!("attribute_not_exists({})", self.name(name))
            }
            Condition::Equals(name, value) => {
                format!("{} = {}", self.name(name), self.value(value))
            }
            Condition::GreaterThan(name, value) => {
                format!("{} > {}", self.name(name), self.value(value))
            }
            Condition::And(a, b) => {
                format!("({}) AND ({})", self.condition(a), self.condition(b))
            }
        }
    }

    /// Render an update expression: `SET` clauses first, then `ADD`.
    pub(crate) fn update(&mut self, actions: &[UpdateAction]) -> String {
        let mut set = Vec::new();
        let mut add = Vec::new();
        for action in actions {
            match action {
                UpdateAction::Set(name, value) => {
                    set.push(format!("{} = {}", self.name(name), self.value(value)));
                }
                UpdateAction::Add(name, delta) => {
                    add.push(format!(
                        "{} {}",
                        self.name(name),
                        self.value(&AttrValue::N(*delta))
                    ));
                }
            }
        }

        let mut clauses = Vec::new();
        if !set.is_empty() {
            clauses.push(format!("SET {}", set.join(", ")));
        }
        if !add.is_empty() {
            clauses.push(format!("ADD {}", add.join(", ")));
        }
        clauses.join(" ")
    }

    /// Render the key condition of a query.
    pub(crate) fn key_condition(&mut self, query: &Query) -> String {
        let hash = format!(
            "{} = {}",
            self.name(query.index.hash_attribute()),
            self.value(&query.partition)
        );
        match &query.sort_condition {
            None => hash,
            Some(SortKeyCondition::GreaterThan(bound)) => format!(
                "{hash} AND {} > {}",
                self.name(query.index.range_attribute()),
                self.value(bound)
            ),
        }
    }

    /// The placeholder maps, `None` when empty (the service rejects empty maps).
    pub(crate) fn into_parts(
        self,
    ) -> (
        Option<HashMap<String, String>>,
        Option<HashMap<String, AttributeValue>>,
    ) {
        let names = (!self.names.is_empty()).then_some(self.names);
        let values = (!self.values.is_empty()).then_some(self.values);
        (names, values)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::query::Index;
    use crate::schema::attr;

    #[test]
    fn delete_guard() {
        let mut expr = Expression::default();
        let rendered = expr.condition(
            &Condition::equals(attr::LISTING_ID, 100_001)
                .and(Condition::equals(attr::USERNAME, "alice")),
        );
        assert_eq!(rendered, "(#n0 = :v0) AND (#n1 = :v1)");

        let (names, values) = expr.into_parts();
        let names = names.unwrap();
        let values = values.unwrap();
        assert_eq!(names["#n0"], "ListingId");
        assert_eq!(values[":v0"], AttributeValue::N("100001".into()));
        assert_eq!(values[":v1"], AttributeValue::S("alice".into()));
    }

    #[test]
    fn counter_update() {
        let mut expr = Expression::default();
        let rendered = expr.update(&[
            UpdateAction::set(attr::CATEGORY, "Sports"),
            UpdateAction::add(attr::CATEGORY_COUNT, 1),
        ]);
        assert_eq!(rendered, "SET #n0 = :v0 ADD #n1 :v1");
    }

    #[test]
    fn names_are_reused() {
        let mut expr = Expression::default();
        let update = expr.update(&[UpdateAction::add(attr::CATEGORY_COUNT, -1)]);
        let guard = expr.condition(&Condition::greater_than(attr::CATEGORY_COUNT, 0));
        assert_eq!(update, "ADD #n0 :v0");
        assert_eq!(guard, "#n0 > :v1");
    }

    #[test]
    fn top_category_key_condition() {
        let query = Query::new(Index::CategoryCount, -2)
            .with_sort_condition(SortKeyCondition::GreaterThan(AttrValue::N(0)));
        let mut expr = Expression::default();
        assert_eq!(expr.key_condition(&query), "#n0 = :v0 AND #n1 > :v1");
        let (names, _) = expr.into_parts();
        let names = names.unwrap();
        assert_eq!(names["#n0"], "ListingId");
        assert_eq!(names["#n1"], "CategoryCount");
    }

    #[test]
    fn empty_maps_are_omitted() {
        let (names, values) = Expression::default().into_parts();
        assert!(names.is_none());
        assert!(values.is_none());
    }
}
