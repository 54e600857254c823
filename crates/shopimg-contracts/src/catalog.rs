use std::path::PathBuf;

use anyhow::Result;
use serde::{Deserialize, Serialize};

use crate::images::ProductImageRequest;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Product {
    pub slug: String,
    pub name: String,
    pub category: String,
    #[serde(default)]
    pub image: Option<String>,
}

impl Product {
    /// Request with no remote sources; callers attach URLs from their table.
    pub fn image_request(&self) -> ProductImageRequest {
        ProductImageRequest::new(&self.slug, &self.category, &self.name)
    }
}

/// The surrounding shop's persistence layer.
///
/// `save_image` replaces whatever image the product had before; it never
/// leaves a half-written file behind under `filename`.
pub trait Catalog {
    fn list_products(&self) -> Result<Vec<Product>>;
    fn find_product(&self, slug: &str) -> Result<Option<Product>>;
    fn save_image(&mut self, product: &Product, filename: &str, bytes: &[u8]) -> Result<PathBuf>;
}

#[cfg(test)]
mod tests {
    use super::Product;

    #[test]
    fn product_builds_request_without_sources() -> anyhow::Result<()> {
        let product: Product = serde_json::from_str(
            r#"{"slug": "yoga-mat", "name": "Yoga Mat", "category": "Sports & Outdoors"}"#,
        )?;
        assert_eq!(product.image, None);
        let request = product.image_request();
        assert_eq!(request.identity, "yoga-mat");
        assert_eq!(request.display_name, "Yoga Mat");
        assert_eq!(request.category, "Sports & Outdoors");
        assert_eq!(request.remote_url(), None);
        Ok(())
    }
}
