//! # Mutation Builder
//!
//! Turns a domain [`Item`] plus a routing brand into the GraphQL mutation document
//! sent downstream. The query text is constant; only the variables vary.

use crate::codec::Item;
use serde::{Deserialize, Serialize};

/// Mutation creating one item downstream
pub const CREATE_ITEM_MUTATION: &str = "mutation createData($id: String!, $name: String!, $body: String!, $timestamp: Int!, $brand: String!) { createItem(id: $id, name: $name, body: $body, timestamp: $timestamp, brand: $brand) { id name body timestamp brand } }";

/// An [`Item`] tagged with the routing brand required by the downstream schema
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ItemWithBrand {
    #[serde(flatten)]
    pub item: Item,
    pub brand: String,
}

/// Variable bindings for [`CREATE_ITEM_MUTATION`]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MutationVariables {
    pub id: String,
    pub name: String,
    pub body: String,
    pub timestamp: i64,
    pub brand: String,
}

/// A GraphQL query string plus its variable bindings
///
/// Serializes to the `{"query": ..., "variables": {...}}` request body.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MutationDocument {
    pub query: String,
    pub variables: MutationVariables,
}

impl MutationDocument {
    /// Serialize to the JSON request body
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}

/// Extend an item with a routing brand
///
/// The brand is not validated.
pub fn attach_brand(item: Item, brand: &str) -> ItemWithBrand {
    ItemWithBrand {
        item,
        brand: brand.to_string(),
    }
}

/// Build the create-item mutation for a branded item
pub fn build_mutation(payload: &ItemWithBrand) -> MutationDocument {
    MutationDocument {
        query: CREATE_ITEM_MUTATION.to_string(),
        variables: MutationVariables {
            id: payload.item.id.clone(),
            name: payload.item.name.clone(),
            body: payload.item.body.clone(),
            timestamp: payload.item.timestamp,
            brand: payload.brand.clone(),
        },
    }
}

#[cfg(test)]
#[path = "mutation_tests.rs"]
mod tests;
