use crate::entities::brands::Brand;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BrandDisplay {
    pub id: i64,
    pub name: String,
    pub logo: Option<String>,
}

impl From<&Brand> for BrandDisplay {
    fn from(brand: &Brand) -> Self {
        Self {
            id: brand.id,
            name: brand.name.clone(),
            logo: brand.logo.clone(),
        }
    }
}
