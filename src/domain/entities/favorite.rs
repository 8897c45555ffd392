use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Which kind of listing a favorite points at
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ItemKind {
    Product,
    Service,
    Business,
}

impl ItemKind {
    /// Bucket order inside a stored collection
    pub const ALL: [ItemKind; 3] = [ItemKind::Product, ItemKind::Service, ItemKind::Business];

    pub fn as_str(&self) -> &'static str {
        match self {
            ItemKind::Product => "product",
            ItemKind::Service => "service",
            ItemKind::Business => "business",
        }
    }

    /// Name of the bucket this kind is filed under
    pub fn bucket_name(&self) -> &'static str {
        match self {
            ItemKind::Product => "products",
            ItemKind::Service => "services",
            ItemKind::Business => "businesses",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "product" | "products" => Some(ItemKind::Product),
            "service" | "services" => Some(ItemKind::Service),
            "business" | "businesses" => Some(ItemKind::Business),
            _ => None,
        }
    }
}

impl fmt::Display for ItemKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Kind-specific part of the display snapshot, tagged by `type` on the wire.
/// Snapshot fields are written by the web front-end, so nulls and numbers
/// sent as strings read as the field default instead of failing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum ItemDetails {
    Product {
        #[serde(default, deserialize_with = "lenient::number")]
        price: Option<f64>,
        #[serde(default, deserialize_with = "lenient::text")]
        price_currency: Option<String>,
        #[serde(default, deserialize_with = "lenient::text")]
        business_name: Option<String>,
        #[serde(default, deserialize_with = "lenient::text")]
        business_id: Option<String>,
        #[serde(default = "default_true", deserialize_with = "lenient::flag")]
        in_stock: bool,
    },
    Service {
        #[serde(default, deserialize_with = "lenient::number")]
        price: Option<f64>,
        #[serde(default, deserialize_with = "lenient::text")]
        price_currency: Option<String>,
        #[serde(default, deserialize_with = "lenient::text")]
        business_name: Option<String>,
        #[serde(default, deserialize_with = "lenient::text")]
        business_id: Option<String>,
        #[serde(default = "default_true", deserialize_with = "lenient::flag")]
        is_active: bool,
    },
    Business {
        #[serde(default, deserialize_with = "lenient::number")]
        rating: Option<f64>,
        #[serde(default, deserialize_with = "lenient::count")]
        review_count: u32,
    },
}

fn default_true() -> bool {
    true
}

/// Field readers that map null and mistyped snapshot values to defaults
mod lenient {
    use chrono::{DateTime, Utc};
    use serde::{Deserialize, Deserializer};
    use serde_json::Value;

    pub fn number<'de, D: Deserializer<'de>>(d: D) -> Result<Option<f64>, D::Error> {
        Ok(match Option::<Value>::deserialize(d)? {
            Some(Value::Number(n)) => n.as_f64(),
            Some(Value::String(s)) => s.trim().parse().ok(),
            _ => None,
        })
    }

    pub fn count<'de, D: Deserializer<'de>>(d: D) -> Result<u32, D::Error> {
        Ok(number(d)?
            .filter(|n| n.is_finite() && *n >= 0.0)
            .map(|n| n.min(u32::MAX as f64) as u32)
            .unwrap_or(0))
    }

    pub fn flag<'de, D: Deserializer<'de>>(d: D) -> Result<bool, D::Error> {
        Ok(match Option::<Value>::deserialize(d)? {
            Some(Value::Bool(b)) => b,
            Some(Value::String(s)) => !s.eq_ignore_ascii_case("false"),
            Some(Value::Number(n)) => n.as_f64() != Some(0.0),
            _ => true,
        })
    }

    pub fn text<'de, D: Deserializer<'de>>(d: D) -> Result<Option<String>, D::Error> {
        Ok(match Option::<Value>::deserialize(d)? {
            Some(Value::String(s)) => Some(s),
            Some(Value::Number(n)) => Some(n.to_string()),
            _ => None,
        })
    }

    pub fn text_or_empty<'de, D: Deserializer<'de>>(d: D) -> Result<String, D::Error> {
        Ok(text(d)?.unwrap_or_default())
    }

    /// Ids may arrive as JSON numbers; anything else is rejected
    pub fn id<'de, D: Deserializer<'de>>(d: D) -> Result<String, D::Error> {
        match Value::deserialize(d)? {
            Value::String(s) => Ok(s),
            Value::Number(n) => Ok(n.to_string()),
            other => Err(serde::de::Error::custom(format!("invalid favorite id: {}", other))),
        }
    }

    pub fn timestamp<'de, D: Deserializer<'de>>(d: D) -> Result<DateTime<Utc>, D::Error> {
        Ok(match Option::<Value>::deserialize(d)? {
            Some(Value::String(s)) => DateTime::parse_from_rfc3339(&s)
                .map(|t| t.with_timezone(&Utc))
                .unwrap_or_else(|_| Utc::now()),
            _ => Utc::now(),
        })
    }
}

impl ItemDetails {
    pub fn kind(&self) -> ItemKind {
        match self {
            ItemDetails::Product { .. } => ItemKind::Product,
            ItemDetails::Service { .. } => ItemKind::Service,
            ItemDetails::Business { .. } => ItemKind::Business,
        }
    }

    fn empty(kind: ItemKind) -> Self {
        match kind {
            ItemKind::Product => ItemDetails::Product {
                price: None,
                price_currency: None,
                business_name: None,
                business_id: None,
                in_stock: true,
            },
            ItemKind::Service => ItemDetails::Service {
                price: None,
                price_currency: None,
                business_name: None,
                business_id: None,
                is_active: true,
            },
            ItemKind::Business => ItemDetails::Business {
                rating: None,
                review_count: 0,
            },
        }
    }
}

/// Snapshot of a listing taken at the moment it was favorited
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FavoriteRecord {
    #[serde(deserialize_with = "lenient::id")]
    pub id: String,
    #[serde(default, deserialize_with = "lenient::text_or_empty")]
    pub name: String,
    #[serde(default, deserialize_with = "lenient::text")]
    pub description: Option<String>,
    #[serde(flatten)]
    pub details: ItemDetails,
    #[serde(default = "Utc::now", deserialize_with = "lenient::timestamp")]
    pub created_at: DateTime<Utc>,
}

impl FavoriteRecord {
    pub fn new(kind: ItemKind, id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            description: None,
            details: ItemDetails::empty(kind),
            created_at: Utc::now(),
        }
    }

    pub fn product(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self::new(ItemKind::Product, id, name)
    }

    pub fn service(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self::new(ItemKind::Service, id, name)
    }

    pub fn business(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self::new(ItemKind::Business, id, name)
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Sets the price; ignored for businesses
    pub fn with_price(mut self, amount: f64, currency: impl Into<String>) -> Self {
        match &mut self.details {
            ItemDetails::Product { price, price_currency, .. }
            | ItemDetails::Service { price, price_currency, .. } => {
                *price = Some(amount);
                *price_currency = Some(currency.into());
            }
            ItemDetails::Business { .. } => {}
        }
        self
    }

    /// Sets the owning business; ignored for businesses
    pub fn with_business(mut self, id: impl Into<String>, name: impl Into<String>) -> Self {
        match &mut self.details {
            ItemDetails::Product { business_id, business_name, .. }
            | ItemDetails::Service { business_id, business_name, .. } => {
                *business_id = Some(id.into());
                *business_name = Some(name.into());
            }
            ItemDetails::Business { .. } => {}
        }
        self
    }

    /// Sets rating and review count; ignored for products and services
    pub fn with_rating(mut self, value: f64, reviews: u32) -> Self {
        if let ItemDetails::Business { rating, review_count } = &mut self.details {
            *rating = Some(value);
            *review_count = reviews;
        }
        self
    }

    pub fn with_created_at(mut self, created_at: DateTime<Utc>) -> Self {
        self.created_at = created_at;
        self
    }

    pub fn kind(&self) -> ItemKind {
        self.details.kind()
    }
}

/// A stored record that breaks the one-bucket-per-id rule
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Inconsistency {
    /// Record filed under a bucket that does not match its `type`
    WrongBucket {
        id: String,
        bucket: ItemKind,
        declared: ItemKind,
    },
    /// Same id seen again after its first occurrence
    Duplicate { id: String, bucket: ItemKind },
}

/// One user's favorites, split into the three typed buckets.
///
/// Records are decoded one by one: an unreadable record is dropped with a
/// warning and the rest of the bucket survives. Only a document that is not
/// a JSON object fails to parse.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FavoritesCollection {
    #[serde(default, deserialize_with = "records")]
    pub products: Vec<FavoriteRecord>,
    #[serde(default, deserialize_with = "records")]
    pub services: Vec<FavoriteRecord>,
    #[serde(default, deserialize_with = "records")]
    pub businesses: Vec<FavoriteRecord>,
}

fn records<'de, D: serde::Deserializer<'de>>(d: D) -> Result<Vec<FavoriteRecord>, D::Error> {
    let items = match Option::<serde_json::Value>::deserialize(d)? {
        Some(serde_json::Value::Array(items)) => items,
        None | Some(serde_json::Value::Null) => return Ok(Vec::new()),
        Some(other) => {
            tracing::warn!(value = %other, "Favorites bucket is not a list, reading as empty");
            return Ok(Vec::new());
        }
    };

    Ok(items
        .into_iter()
        .filter_map(|item| match serde_json::from_value::<FavoriteRecord>(item) {
            Ok(record) => Some(record),
            Err(e) => {
                tracing::warn!(error = %e, "Dropping unreadable favorite");
                None
            }
        })
        .collect())
}

impl FavoritesCollection {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn bucket(&self, kind: ItemKind) -> &[FavoriteRecord] {
        match kind {
            ItemKind::Product => &self.products,
            ItemKind::Service => &self.services,
            ItemKind::Business => &self.businesses,
        }
    }

    fn bucket_mut(&mut self, kind: ItemKind) -> &mut Vec<FavoriteRecord> {
        match kind {
            ItemKind::Product => &mut self.products,
            ItemKind::Service => &mut self.services,
            ItemKind::Business => &mut self.businesses,
        }
    }

    /// All records with the bucket they are filed under, in bucket order
    pub fn iter(&self) -> impl Iterator<Item = (ItemKind, &FavoriteRecord)> {
        ItemKind::ALL
            .into_iter()
            .flat_map(move |kind| self.bucket(kind).iter().map(move |r| (kind, r)))
    }

    /// First record with this id in any bucket; the record's `type` is not checked
    pub fn find(&self, id: &str) -> Option<(ItemKind, &FavoriteRecord)> {
        self.iter().find(|(_, record)| record.id == id)
    }

    pub fn contains(&self, id: &str) -> bool {
        self.find(id).is_some()
    }

    /// Whether the id is filed under the bucket for `kind`
    pub fn contains_in(&self, kind: ItemKind, id: &str) -> bool {
        self.bucket(kind).iter().any(|r| r.id == id)
    }

    /// Drops the id from every bucket, returning how many records went
    pub fn remove_everywhere(&mut self, id: &str) -> usize {
        let mut removed = 0;
        for kind in ItemKind::ALL {
            let bucket = self.bucket_mut(kind);
            let before = bucket.len();
            bucket.retain(|r| r.id != id);
            removed += before - bucket.len();
        }
        removed
    }

    /// Files the record under its own bucket after purging the id everywhere.
    /// Returns how many stale copies were purged.
    pub fn insert(&mut self, record: FavoriteRecord) -> usize {
        let purged = self.remove_everywhere(&record.id);
        self.bucket_mut(record.kind()).push(record);
        purged
    }

    pub fn inconsistencies(&self) -> Vec<Inconsistency> {
        let mut seen = std::collections::HashSet::new();
        let mut found = Vec::new();

        for (bucket, record) in self.iter() {
            if !seen.insert(record.id.as_str()) {
                found.push(Inconsistency::Duplicate {
                    id: record.id.clone(),
                    bucket,
                });
            } else if record.kind() != bucket {
                found.push(Inconsistency::WrongBucket {
                    id: record.id.clone(),
                    bucket,
                    declared: record.kind(),
                });
            }
        }

        found
    }

    /// Re-files every record under its declared bucket, keeping the first
    /// copy of each id. Returns the number of records moved or dropped.
    pub fn repair(&mut self) -> usize {
        let mut seen = std::collections::HashSet::new();
        let mut rebuilt = FavoritesCollection::default();
        let mut changed = 0;

        for kind in ItemKind::ALL {
            for record in std::mem::take(self.bucket_mut(kind)) {
                if !seen.insert(record.id.clone()) {
                    changed += 1;
                    continue;
                }
                if record.kind() != kind {
                    changed += 1;
                }
                rebuilt.bucket_mut(record.kind()).push(record);
            }
        }

        *self = rebuilt;
        changed
    }

    pub fn len(&self) -> usize {
        self.products.len() + self.services.len() + self.businesses.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_wire_shape() {
        let record = FavoriteRecord::product("p1", "Candles")
            .with_price(12.5, "USD")
            .with_business("b1", "Grace Goods");
        let json = serde_json::to_value(&record).unwrap();

        assert_eq!(json["id"], "p1");
        assert_eq!(json["type"], "product");
        assert_eq!(json["name"], "Candles");
        assert_eq!(json["price"], 12.5);
        assert_eq!(json["price_currency"], "USD");
        assert_eq!(json["business_id"], "b1");
        assert_eq!(json["in_stock"], true);
        assert!(json["created_at"].is_string());
    }

    #[test]
    fn test_record_reads_sparse_json() {
        let record: FavoriteRecord =
            serde_json::from_str(r#"{"id":"b7","type":"business","name":"Hope Bakery"}"#).unwrap();

        assert_eq!(record.kind(), ItemKind::Business);
        assert_eq!(
            record.details,
            ItemDetails::Business { rating: None, review_count: 0 }
        );
    }

    #[test]
    fn test_record_tolerates_nulls_and_string_numbers() {
        let record: FavoriteRecord = serde_json::from_str(
            r#"{"id":42,"type":"product","name":null,"description":null,"price":"12.50","price_currency":null,"in_stock":null,"created_at":null}"#,
        )
        .unwrap();

        assert_eq!(record.id, "42");
        assert_eq!(record.name, "");
        assert_eq!(
            record.details,
            ItemDetails::Product {
                price: Some(12.5),
                price_currency: None,
                business_name: None,
                business_id: None,
                in_stock: true,
            }
        );
    }

    #[test]
    fn test_bad_record_does_not_sink_the_bucket() {
        let collection: FavoritesCollection = serde_json::from_str(
            r#"{"products":[{"id":"p1","type":"product","name":"Candles"},{"id":null,"type":"product"},{"id":"p2","type":"gadget"}],
                "services":null,
                "businesses":[{"id":"b1","type":"business","name":"Bakery","rating":null,"review_count":null}]}"#,
        )
        .unwrap();

        assert_eq!(collection.products.len(), 1);
        assert_eq!(collection.products[0].id, "p1");
        assert!(collection.services.is_empty());
        assert_eq!(
            collection.businesses[0].details,
            ItemDetails::Business { rating: None, review_count: 0 }
        );
    }

    #[test]
    fn test_non_object_document_fails() {
        assert!(serde_json::from_str::<FavoritesCollection>("{not json").is_err());
        assert!(serde_json::from_str::<FavoritesCollection>("42").is_err());
    }

    #[test]
    fn test_contains_in_checks_the_bucket() {
        let mut collection = FavoritesCollection::new();
        collection.services.push(FavoriteRecord::product("p1", "Candles"));

        assert!(collection.contains("p1"));
        assert!(!collection.contains_in(ItemKind::Product, "p1"));
        assert!(collection.contains_in(ItemKind::Service, "p1"));
    }

    #[test]
    fn test_unknown_type_is_rejected() {
        let parsed: Result<FavoriteRecord, _> =
            serde_json::from_str(r#"{"id":"x","type":"event","name":"Picnic"}"#);
        assert!(parsed.is_err());
    }

    #[test]
    fn test_collection_wire_shape() {
        let mut collection = FavoritesCollection::new();
        collection.insert(FavoriteRecord::service("s1", "Tutoring"));
        let json = serde_json::to_value(&collection).unwrap();

        assert_eq!(json["products"].as_array().unwrap().len(), 0);
        assert_eq!(json["services"][0]["id"], "s1");
        assert_eq!(json["businesses"].as_array().unwrap().len(), 0);

        let partial: FavoritesCollection = serde_json::from_str(r#"{"products":[]}"#).unwrap();
        assert!(partial.is_empty());
    }

    #[test]
    fn test_insert_purges_other_buckets() {
        let mut collection = FavoritesCollection::new();
        collection.services.push(FavoriteRecord::product("p1", "Candles"));

        let purged = collection.insert(FavoriteRecord::product("p1", "Candles"));

        assert_eq!(purged, 1);
        assert_eq!(collection.products.len(), 1);
        assert!(collection.services.is_empty());
    }

    #[test]
    fn test_insert_preserves_order() {
        let mut collection = FavoritesCollection::new();
        collection.insert(FavoriteRecord::product("a", "A"));
        collection.insert(FavoriteRecord::product("b", "B"));
        collection.insert(FavoriteRecord::product("c", "C"));

        let ids: Vec<&str> = collection.products.iter().map(|r| r.id.as_str()).collect();
        assert_eq!(ids, vec!["a", "b", "c"]);
    }

    #[test]
    fn test_find_ignores_declared_type() {
        let mut collection = FavoritesCollection::new();
        collection.businesses.push(FavoriteRecord::product("p1", "Candles"));

        let (bucket, record) = collection.find("p1").unwrap();
        assert_eq!(bucket, ItemKind::Business);
        assert_eq!(record.kind(), ItemKind::Product);
    }

    #[test]
    fn test_inconsistencies_and_repair() {
        let mut collection = FavoritesCollection::new();
        collection.products.push(FavoriteRecord::product("p1", "Candles"));
        collection.services.push(FavoriteRecord::product("p1", "Candles"));
        collection.services.push(FavoriteRecord::business("b1", "Bakery"));

        let found = collection.inconsistencies();
        assert_eq!(
            found,
            vec![
                Inconsistency::Duplicate { id: "p1".to_string(), bucket: ItemKind::Service },
                Inconsistency::WrongBucket {
                    id: "b1".to_string(),
                    bucket: ItemKind::Service,
                    declared: ItemKind::Business,
                },
            ]
        );

        assert_eq!(collection.repair(), 2);
        assert!(collection.inconsistencies().is_empty());
        assert_eq!(collection.products.len(), 1);
        assert!(collection.services.is_empty());
        assert_eq!(collection.businesses[0].id, "b1");
    }

    #[test]
    fn test_item_kind_parse() {
        assert_eq!(ItemKind::parse("Product"), Some(ItemKind::Product));
        assert_eq!(ItemKind::parse("businesses"), Some(ItemKind::Business));
        assert_eq!(ItemKind::parse("event"), None);
        assert_eq!(ItemKind::Service.bucket_name(), "services");
    }
}
