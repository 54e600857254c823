use indexmap::IndexMap;

const UNSPLASH_SUFFIX: &str = "?w=400&h=400&fit=crop";

fn unsplash(photo: &str) -> String {
    format!("https://images.unsplash.com/{photo}{UNSPLASH_SUFFIX}")
}

/// Ordered candidate URLs per product slug. The first URL of each entry is
/// the primary source; the remainder are alternates in declared order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SourceTable {
    entries: IndexMap<String, Vec<String>>,
}

impl SourceTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Slug → URL table used by the bulk download job.
    pub fn builtin_download() -> Self {
        let mut table = Self::new();
        for (slug, photo) in [
            ("wireless-bluetooth-headphones", "photo-1505740420928-5e560c06d30e"),
            ("smartphone-case", "photo-1556656793-08538906a9f8"),
            ("portable-charger", "photo-1609592806787-3d9c5b1b8b8e"),
            ("cotton-t-shirt", "photo-1521572163474-6864f9cf17ab"),
            ("denim-jeans", "photo-1542272604-787c3835535d"),
            ("winter-jacket", "photo-1551028719-00167b16eac5"),
            ("python-programming-guide", "photo-1516979187457-637abb4f9353"),
            ("science-fiction-novel", "photo-1507003211169-0a1dd7228f2d"),
            ("led-desk-lamp", "photo-1507473885765-e6ed057f782c"),
            ("plant-pot-set", "photo-1485955900006-10f4d324d411"),
            ("yoga-mat", "photo-1544367567-0f2fcb009e0b"),
            ("water-bottle", "photo-1602143407151-7111542de6e8"),
            ("vitamin-c-serum", "photo-1556228578-8c89e6adf883"),
            ("essential-oil-set", "photo-1608571423902-eed4a5ad8108"),
        ] {
            table.insert(slug, vec![unsplash(photo)]);
        }
        table
    }

    /// Primary plus alternates for the products that need a second attempt.
    pub fn builtin_refetch() -> Self {
        let mut table = Self::new();
        table.insert(
            "portable-charger",
            [
                "photo-1583394838336-acd977736f90",
                "photo-1609592806787-3d9c5b1b8b8e",
                "photo-1558618666-fcd25c85cd64",
                "photo-1609081219090-a6d81d3085bf",
            ]
            .iter()
            .map(|photo| unsplash(photo))
            .collect(),
        );
        table.insert(
            "science-fiction-novel",
            [
                "photo-1481627834876-b7833e8f5570",
                "photo-1544716278-ca5e3f4abd8c",
                "photo-1507003211169-0a1dd7228f2d",
                "photo-1495446815901-a7297e633e8d",
            ]
            .iter()
            .map(|photo| unsplash(photo))
            .collect(),
        );
        table.insert(
            "yoga-mat",
            [
                "photo-1506629905607-c52b1b8e8d19",
                "photo-1571019613454-1cb2f99b2d8b",
                "photo-1544367567-0f2fcb009e0b",
                "photo-1506629905607-c52b1b8e8d19",
            ]
            .iter()
            .map(|photo| unsplash(photo))
            .collect(),
        );
        table
    }

    pub fn insert(&mut self, slug: impl Into<String>, urls: Vec<String>) {
        let urls = urls
            .into_iter()
            .map(|url| url.trim().to_string())
            .filter(|url| !url.is_empty())
            .collect::<Vec<String>>();
        self.entries.insert(slug.into(), urls);
    }

    /// Empty slice when the slug has no mapped URL.
    pub fn get(&self, slug: &str) -> &[String] {
        self.entries
            .get(slug)
            .map(Vec::as_slice)
            .unwrap_or_default()
    }

    pub fn contains(&self, slug: &str) -> bool {
        !self.get(slug).is_empty()
    }

    pub fn slugs(&self) -> Vec<String> {
        self.entries.keys().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn merge(&mut self, other: &IndexMap<String, Vec<String>>) {
        for (slug, urls) in other {
            self.insert(slug.clone(), urls.clone());
        }
    }
}

/// Candidate local file basenames (without extension) per product slug.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CustomImageTable {
    entries: IndexMap<String, Vec<String>>,
}

impl CustomImageTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn builtin() -> Self {
        let mut table = Self::new();
        table.insert(
            "portable-charger",
            &["portable_charger_image", "portable_charger", "charger"],
        );
        table.insert("yoga-mat", &["yoga_mat_image", "yoga_mat", "yoga"]);
        table.insert(
            "science-fiction-novel",
            &["science_fiction_image", "science_fiction", "books", "novel"],
        );
        table
    }

    pub fn insert(&mut self, slug: impl Into<String>, basenames: &[&str]) {
        self.entries.insert(
            slug.into(),
            basenames.iter().map(|name| (*name).to_string()).collect(),
        );
    }

    pub fn get(&self, slug: &str) -> &[String] {
        self.entries
            .get(slug)
            .map(Vec::as_slice)
            .unwrap_or_default()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &[String])> {
        self.entries
            .iter()
            .map(|(slug, names)| (slug.as_str(), names.as_slice()))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn merge(&mut self, other: &IndexMap<String, Vec<String>>) {
        for (slug, names) in other {
            self.entries.insert(slug.clone(), names.clone());
        }
    }
}
