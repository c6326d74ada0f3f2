use axum::{extract::State, Json};
use bson::oid::ObjectId;
use serde::{Deserialize, Serialize};

use crate::{error::Error, mongo_ext::Collection, util::ObjectIdString};

#[derive(Clone)]
pub struct CategoryCollection(pub Collection<CategoryModel>);

impl std::ops::Deref for CategoryCollection {
    type Target = Collection<CategoryModel>;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

/// Read-only reference data, seeded by the migration.
#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct CategoryModel {
    #[serde(rename = "_id")]
    pub id: ObjectId,
    pub category_name: String,
}

#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct Category {
    pub id: ObjectIdString,
    pub category_name: String,
}

impl From<CategoryModel> for Category {
    fn from(value: CategoryModel) -> Self {
        Self {
            id: value.id.into(),
            category_name: value.category_name,
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct IndexResponse {
    pub categories: Vec<Category>,
}

pub async fn index(
    State(categories): State<CategoryCollection>,
) -> Result<Json<IndexResponse>, Error> {
    let categories = categories.find_all(None).await?;

    Ok(Json(IndexResponse {
        categories: categories.into_iter().map(Into::into).collect(),
    }))
}
