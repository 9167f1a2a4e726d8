//! Household inventory records and the grouped list view

pub mod tracker;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::store::{Document, Snapshot, StoreError, StoredDocument};

pub use tracker::Tracker;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Location {
    #[serde(rename = "Pantry Closet")]
    PantryCloset,
    Basement,
    Office,
    Garage,
}

impl Location {
    /// Display order of the location groups
    pub const ALL: [Location; 4] = [
        Location::PantryCloset,
        Location::Basement,
        Location::Office,
        Location::Garage,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Location::PantryCloset => "Pantry Closet",
            Location::Basement => "Basement",
            Location::Office => "Office",
            Location::Garage => "Garage",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|l| l.as_str().eq_ignore_ascii_case(s.trim()))
    }

    pub fn next(&self) -> Self {
        let idx = Self::ALL.iter().position(|l| l == self).unwrap_or(0);
        Self::ALL[(idx + 1) % Self::ALL.len()]
    }
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ItemType {
    #[serde(rename = "Pantry Item")]
    PantryItem,
    Supply,
}

impl ItemType {
    pub const ALL: [ItemType; 2] = [ItemType::PantryItem, ItemType::Supply];

    pub fn as_str(&self) -> &'static str {
        match self {
            ItemType::PantryItem => "Pantry Item",
            ItemType::Supply => "Supply",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|t| t.as_str().eq_ignore_ascii_case(s.trim()))
    }

    pub fn next(&self) -> Self {
        match self {
            ItemType::PantryItem => ItemType::Supply,
            ItemType::Supply => ItemType::PantryItem,
        }
    }
}

impl fmt::Display for ItemType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Active type filter for the list view
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Filter {
    #[default]
    All,
    Only(ItemType),
}

impl Filter {
    pub fn matches(&self, item: &Item) -> bool {
        match self {
            Filter::All => true,
            Filter::Only(t) => item.item_type() == *t,
        }
    }

    /// All -> Pantry Item -> Supply -> All
    pub fn next(&self) -> Self {
        match self {
            Filter::All => Filter::Only(ItemType::PantryItem),
            Filter::Only(ItemType::PantryItem) => Filter::Only(ItemType::Supply),
            Filter::Only(ItemType::Supply) => Filter::All,
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        if s.trim().eq_ignore_ascii_case("all") {
            return Some(Filter::All);
        }
        ItemType::parse(s).map(Filter::Only)
    }

    pub fn label(&self) -> &'static str {
        match self {
            Filter::All => "All Items",
            Filter::Only(ItemType::PantryItem) => "Pantry Items",
            Filter::Only(ItemType::Supply) => "Supplies",
        }
    }

    /// Text shown in a location group with nothing to list
    pub fn placeholder(&self) -> String {
        match self {
            Filter::All => "No items in this location.".to_string(),
            Filter::Only(t) => format!("No {} items in this location.", t.as_str().to_lowercase()),
        }
    }
}

/// Fields written when an item is created
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewItem {
    pub name: String,
    pub quantity: u32,
    pub location: Location,
    #[serde(rename = "type")]
    pub item_type: ItemType,
    #[serde(rename = "userId", skip_serializing_if = "Option::is_none")]
    pub owner_id: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl NewItem {
    pub fn to_document(&self) -> Result<Document, StoreError> {
        match serde_json::to_value(self)? {
            serde_json::Value::Object(map) => Ok(map),
            other => Err(StoreError::Malformed {
                id: "<new>".to_string(),
                reason: format!("record serialized to {} instead of an object", other),
            }),
        }
    }
}

/// A stored inventory item
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Item {
    pub id: String,
    #[serde(flatten)]
    pub fields: NewItem,
}

impl Item {
    /// Parse a stored document, naming the document on failure
    pub fn from_document(doc: &StoredDocument) -> Result<Self, StoreError> {
        let fields: NewItem = serde_json::from_value(serde_json::Value::Object(doc.data.clone()))
            .map_err(|e| StoreError::Malformed {
                id: doc.id.clone(),
                reason: e.to_string(),
            })?;
        Ok(Self {
            id: doc.id.clone(),
            fields,
        })
    }

    pub fn name(&self) -> &str {
        &self.fields.name
    }

    pub fn quantity(&self) -> u32 {
        self.fields.quantity
    }

    pub fn location(&self) -> Location {
        self.fields.location
    }

    pub fn item_type(&self) -> ItemType {
        self.fields.item_type
    }
}

/// Parse every document in a snapshot. Malformed documents are returned
/// separately, one error per document.
pub fn parse_snapshot(snapshot: &Snapshot) -> (Vec<Item>, Vec<StoreError>) {
    let mut items = Vec::with_capacity(snapshot.len());
    let mut malformed = Vec::new();
    for doc in &snapshot.docs {
        match Item::from_document(doc) {
            Ok(item) => items.push(item),
            Err(e) => malformed.push(e),
        }
    }
    (items, malformed)
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LocationGroup {
    pub location: Location,
    pub items: Vec<Item>,
    /// Set when `items` is empty
    #[serde(skip_serializing_if = "Option::is_none")]
    pub placeholder: Option<String>,
}

/// Items grouped into the four fixed locations under the active filter
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ListView {
    pub groups: Vec<LocationGroup>,
}

impl ListView {
    pub fn build(items: &[Item], filter: Filter) -> Self {
        let groups = Location::ALL
            .into_iter()
            .map(|location| {
                let mut matching: Vec<Item> = items
                    .iter()
                    .filter(|i| i.location() == location && filter.matches(i))
                    .cloned()
                    .collect();
                matching.sort_by_key(|i| i.name().to_lowercase());

                let placeholder = matching.is_empty().then(|| filter.placeholder());
                LocationGroup {
                    location,
                    items: matching,
                    placeholder,
                }
            })
            .collect();

        Self { groups }
    }

    pub fn group(&self, location: Location) -> Option<&LocationGroup> {
        self.groups.iter().find(|g| g.location == location)
    }

    /// Items in display order across every group
    pub fn items(&self) -> impl Iterator<Item = &Item> {
        self.groups.iter().flat_map(|g| g.items.iter())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    pub(crate) fn item(id: &str, name: &str, location: Location, item_type: ItemType) -> Item {
        Item {
            id: id.to_string(),
            fields: NewItem {
                name: name.to_string(),
                quantity: 1,
                location,
                item_type,
                owner_id: None,
                created_at: Utc::now(),
            },
        }
    }

    fn stored(id: &str, value: serde_json::Value) -> StoredDocument {
        StoredDocument {
            id: id.to_string(),
            data: value.as_object().cloned().unwrap(),
        }
    }

    #[test]
    fn test_filter_groups_by_location() {
        let items = vec![
            item("1", "Rice", Location::PantryCloset, ItemType::PantryItem),
            item("2", "Light bulbs", Location::PantryCloset, ItemType::Supply),
            item("3", "Motor oil", Location::Garage, ItemType::Supply),
            item("4", "Beans", Location::Garage, ItemType::PantryItem),
        ];

        let view = ListView::build(&items, Filter::Only(ItemType::Supply));

        assert_eq!(view.groups.len(), 4);
        assert!(view.items().all(|i| i.item_type() == ItemType::Supply));
        assert_eq!(view.items().count(), 2);

        let pantry = view.group(Location::PantryCloset).unwrap();
        assert_eq!(pantry.items.len(), 1);
        assert!(pantry.placeholder.is_none());

        for location in [Location::Office, Location::Basement] {
            let group = view.group(location).unwrap();
            assert!(group.items.is_empty());
            assert_eq!(
                group.placeholder.as_deref(),
                Some("No supply items in this location.")
            );
        }
    }

    #[test]
    fn test_all_filter_keeps_everything_in_fixed_order() {
        let items = vec![
            item("1", "Tape", Location::Office, ItemType::Supply),
            item("2", "apples", Location::Basement, ItemType::PantryItem),
            item("3", "Flour", Location::Basement, ItemType::PantryItem),
        ];

        let view = ListView::build(&items, Filter::All);
        let locations: Vec<Location> = view.groups.iter().map(|g| g.location).collect();
        assert_eq!(locations, Location::ALL.to_vec());

        let basement: Vec<&str> = view
            .group(Location::Basement)
            .unwrap()
            .items
            .iter()
            .map(|i| i.name())
            .collect();
        assert_eq!(basement, vec!["apples", "Flour"]);
        assert_eq!(
            view.group(Location::Garage).unwrap().placeholder.as_deref(),
            Some("No items in this location.")
        );
    }

    #[test]
    fn test_filter_cycle_and_parse() {
        assert_eq!(Filter::All.next(), Filter::Only(ItemType::PantryItem));
        assert_eq!(Filter::All.next().next().next(), Filter::All);
        assert_eq!(Filter::parse("supply"), Some(Filter::Only(ItemType::Supply)));
        assert_eq!(Filter::parse("ALL"), Some(Filter::All));
        assert_eq!(Filter::parse("snacks"), None);
        assert_eq!(Location::parse("pantry closet"), Some(Location::PantryCloset));
        assert_eq!(Location::Garage.next(), Location::PantryCloset);
    }

    #[test]
    fn test_document_round_trip_uses_store_field_names() {
        let fields = NewItem {
            name: "Rice".to_string(),
            quantity: 2,
            location: Location::PantryCloset,
            item_type: ItemType::PantryItem,
            owner_id: Some("user-1".to_string()),
            created_at: Utc::now(),
        };
        let doc = fields.to_document().unwrap();

        assert_eq!(doc["location"], json!("Pantry Closet"));
        assert_eq!(doc["type"], json!("Pantry Item"));
        assert_eq!(doc["userId"], json!("user-1"));
        assert!(doc.contains_key("createdAt"));

        let parsed = Item::from_document(&StoredDocument {
            id: "abc".to_string(),
            data: doc,
        })
        .unwrap();
        assert_eq!(parsed.id, "abc");
        assert_eq!(parsed.fields, fields);
    }

    #[test]
    fn test_malformed_document_names_the_id() {
        let snapshot = Snapshot {
            docs: vec![
                stored(
                    "good",
                    json!({"name": "Salt", "quantity": 1, "location": "Office",
                           "type": "Supply", "createdAt": "2024-05-01T10:00:00Z"}),
                ),
                stored(
                    "bad",
                    json!({"name": "Salt", "quantity": -4, "location": "Office",
                           "type": "Supply", "createdAt": "2024-05-01T10:00:00Z"}),
                ),
            ],
        };

        let (items, malformed) = parse_snapshot(&snapshot);
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].id, "good");
        assert_eq!(malformed.len(), 1);
        match &malformed[0] {
            StoreError::Malformed { id, .. } => assert_eq!(id, "bad"),
            other => panic!("expected malformed error, got {:?}", other),
        }
    }

    #[test]
    fn test_unknown_location_is_rejected() {
        let doc = stored(
            "x",
            json!({"name": "Tent", "quantity": 1, "location": "Attic",
                   "type": "Supply", "createdAt": "2024-05-01T10:00:00Z"}),
        );
        assert!(Item::from_document(&doc).is_err());
    }
}
