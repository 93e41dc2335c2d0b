use std::fmt;

/// Table reference, optionally schema-qualified
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Identifier {
    schema: Option<String>,
    table: String,
}

impl Identifier {
    pub fn table(table: &str) -> Self {
        Self {
            schema: None,
            table: table.to_string(),
        }
    }

    /// Table inside an attached database (`main`, `temp`, or an `ATTACH` alias)
    pub fn qualified(schema: &str, table: &str) -> Self {
        Self {
            schema: Some(schema.to_string()),
            table: table.to_string(),
        }
    }

    pub fn schema(&self) -> Option<&str> {
        self.schema.as_deref()
    }

    pub fn table_name(&self) -> &str {
        &self.table
    }

    /// SQL rendering with every part double-quoted
    pub fn quoted(&self) -> String {
        match &self.schema {
            Some(schema) => format!("{}.{}", quote(schema), quote(&self.table)),
            None => quote(&self.table),
        }
    }
}

fn quote(part: &str) -> String {
    format!("\"{}\"", part.replace('"', "\"\""))
}

impl fmt::Display for Identifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.schema {
            Some(schema) => write!(f, "{}.{}", schema, self.table),
            None => f.write_str(&self.table),
        }
    }
}

impl From<&str> for Identifier {
    fn from(table: &str) -> Self {
        Identifier::table(table)
    }
}

impl From<String> for Identifier {
    fn from(table: String) -> Self {
        Self {
            schema: None,
            table,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_quoted_plain_table() {
        assert_eq!(Identifier::table("users").quoted(), "\"users\"");
    }

    #[test]
    fn test_quoted_escapes_embedded_quotes() {
        assert_eq!(Identifier::table("we\"ird").quoted(), "\"we\"\"ird\"");
    }

    #[test]
    fn test_qualified() {
        let ident = Identifier::qualified("archive", "orders");
        assert_eq!(ident.quoted(), "\"archive\".\"orders\"");
        assert_eq!(ident.schema(), Some("archive"));
        assert_eq!(ident.table_name(), "orders");
        assert_eq!(ident.to_string(), "archive.orders");
    }
}
