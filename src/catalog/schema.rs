//! Table and column names of the calibre library schema.

/// One metadata dimension: a domain table of display values and the
/// many-to-many link table tying its rows to books.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Dimension {
    pub table: String,
    /// Column of `table` holding the display value.
    pub display_column: String,
    pub link_table: String,
    /// Column of `link_table` referencing `table.id`.
    pub link_column: String,
}

impl Dimension {
    /// Dimension following calibre's `books_<table>_link` naming.
    pub fn new(table: &str, display_column: &str, link_column: &str) -> Self {
        Self {
            table: table.to_string(),
            display_column: display_column.to_string(),
            link_table: format!("books_{}_link", table),
            link_column: link_column.to_string(),
        }
    }
}

/// A row of calibre's `custom_columns` directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CustomColumnInfo {
    pub id: i64,
    pub name: String,
    pub datatype: String,
    /// Values live in their own table, tied to books by a link table.
    pub normalized: bool,
}

/// Where the values of a custom column are stored.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CustomColumn {
    /// `custom_column_<id>` holds the values, `books_custom_column_<id>_link`
    /// ties them to books.
    Normalized(Dimension),
    /// `custom_column_<id>` holds one `(book, value)` row per book.
    Direct { table: String, datatype: String },
}

impl CustomColumn {
    /// Tables the column's values are read from.
    pub fn tables(&self) -> Vec<&str> {
        match self {
            CustomColumn::Normalized(dimension) => {
                vec![dimension.table.as_str(), dimension.link_table.as_str()]
            }
            CustomColumn::Direct { table, .. } => vec![table.as_str()],
        }
    }
}

/// Every name the catalog reader needs to find its way around the database.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SchemaDescriptor {
    pub books_table: String,
    pub data_table: String,
    pub custom_columns_table: String,
    pub series: Dimension,
    pub tags: Dimension,
    pub authors: Dimension,
    pub publishers: Dimension,
    pub languages: Dimension,
}

impl SchemaDescriptor {
    pub fn calibre() -> Self {
        Self {
            books_table: "books".to_string(),
            data_table: "data".to_string(),
            custom_columns_table: "custom_columns".to_string(),
            series: Dimension::new("series", "name", "series"),
            tags: Dimension::new("tags", "name", "tag"),
            authors: Dimension::new("authors", "name", "author"),
            publishers: Dimension::new("publishers", "name", "publisher"),
            languages: Dimension::new("languages", "lang_code", "lang_code"),
        }
    }

    /// Tables that must exist for a read to make sense.
    pub fn required_tables(&self) -> Vec<&str> {
        let mut tables = vec![
            self.books_table.as_str(),
            self.data_table.as_str(),
            self.custom_columns_table.as_str(),
        ];
        for dimension in self.dimensions() {
            tables.push(&dimension.table);
            tables.push(&dimension.link_table);
        }
        tables
    }

    pub fn dimensions(&self) -> [&Dimension; 5] {
        [
            &self.series,
            &self.tags,
            &self.authors,
            &self.publishers,
            &self.languages,
        ]
    }

    /// Dimension of the normalized custom column with calibre id `column_id`.
    pub fn custom_column(&self, column_id: i64) -> Dimension {
        Dimension::new(&custom_column_table(column_id), "value", "value")
    }

    /// Storage layout of the custom column described by `info`.
    pub fn custom_column_storage(&self, info: &CustomColumnInfo) -> CustomColumn {
        if info.normalized {
            CustomColumn::Normalized(self.custom_column(info.id))
        } else {
            CustomColumn::Direct {
                table: custom_column_table(info.id),
                datatype: info.datatype.clone(),
            }
        }
    }
}

fn custom_column_table(column_id: i64) -> String {
    format!("custom_column_{}", column_id)
}

impl Default for SchemaDescriptor {
    fn default() -> Self {
        Self::calibre()
    }
}

/// The custom column whose display name is `name`.
pub fn find_custom_column<'a>(
    columns: &'a [CustomColumnInfo],
    name: &str,
) -> Option<&'a CustomColumnInfo> {
    columns.iter().find(|column| column.name == name)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_calibre_link_tables() {
        let schema = SchemaDescriptor::calibre();
        assert_eq!(schema.tags.link_table, "books_tags_link");
        assert_eq!(schema.languages.display_column, "lang_code");
        assert_eq!(schema.series.link_column, "series");
    }

    #[test]
    fn test_required_tables() {
        let schema = SchemaDescriptor::calibre();
        let tables = schema.required_tables();
        assert_eq!(tables.len(), 13);
        assert!(tables.contains(&"books_publishers_link"));
        assert!(tables.contains(&"custom_columns"));
    }

    #[test]
    fn test_custom_column_tables() {
        let dimension = SchemaDescriptor::calibre().custom_column(3);
        assert_eq!(dimension.table, "custom_column_3");
        assert_eq!(dimension.link_table, "books_custom_column_3_link");
        assert_eq!(dimension.display_column, "value");
        assert_eq!(dimension.link_column, "value");
    }

    fn column(id: i64, name: &str, datatype: &str, normalized: bool) -> CustomColumnInfo {
        CustomColumnInfo {
            id,
            name: name.to_string(),
            datatype: datatype.to_string(),
            normalized,
        }
    }

    #[test]
    fn test_find_custom_column() {
        let columns = vec![
            column(1, "rating", "rating", true),
            column(4, "statut", "enumeration", true),
        ];
        assert_eq!(find_custom_column(&columns, "statut").map(|c| c.id), Some(4));
        assert!(find_custom_column(&columns, "status").is_none());
    }

    #[test]
    fn test_custom_column_storage() {
        let schema = SchemaDescriptor::calibre();

        let normalized = schema.custom_column_storage(&column(2, "statut", "enumeration", true));
        assert_eq!(normalized, CustomColumn::Normalized(schema.custom_column(2)));
        assert_eq!(
            normalized.tables(),
            vec!["custom_column_2", "books_custom_column_2_link"]
        );

        let direct = schema.custom_column_storage(&column(5, "lu", "bool", false));
        assert_eq!(
            direct,
            CustomColumn::Direct {
                table: "custom_column_5".to_string(),
                datatype: "bool".to_string(),
            }
        );
        assert_eq!(direct.tables(), vec!["custom_column_5"]);
    }
}
