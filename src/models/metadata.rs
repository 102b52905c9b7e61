use serde::{Deserialize, Serialize};

/// Schema metadata introspected from a target database, request-scoped.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseMetadata {
    pub tables: Vec<Table>,
    pub views: Vec<View>,
    pub schemas: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Table {
    pub name: String,
    pub schema: Option<String>,
    pub columns: Vec<Column>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct View {
    pub name: String,
    pub schema: Option<String>,
    pub columns: Vec<Column>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Column {
    pub name: String,
    pub data_type: String,
    pub is_nullable: bool,
    pub is_primary_key: bool,
    pub default_value: Option<String>,
}

impl DatabaseMetadata {
    pub fn new(tables: Vec<Table>, views: Vec<View>, schemas: Vec<String>) -> Self {
        Self {
            tables,
            views,
            schemas,
        }
    }

    /// Render the metadata as readable text. This is both the `/schema`
    /// response body and the schema context handed to the LLM, so it must
    /// be deterministic for an unchanged database.
    pub fn table_info(&self) -> String {
        let mut context = String::from("Database Schema:\n\n");

        if !self.schemas.is_empty() {
            context.push_str("Schemas: ");
            context.push_str(&self.schemas.join(", "));
            context.push_str("\n\n");
        }

        if !self.tables.is_empty() {
            context.push_str("Tables:\n");
            for table in &self.tables {
                Self::push_relation(&mut context, &table.name, &table.schema, &table.columns, true);
            }
            context.push('\n');
        }

        if !self.views.is_empty() {
            context.push_str("Views:\n");
            for view in &self.views {
                Self::push_relation(&mut context, &view.name, &view.schema, &view.columns, false);
            }
        }

        context
    }

    fn push_relation(
        context: &mut String,
        name: &str,
        schema: &Option<String>,
        columns: &[Column],
        with_constraints: bool,
    ) {
        match schema {
            Some(s) => context.push_str(&format!("  - {}.{}\n", s, name)),
            None => context.push_str(&format!("  - {}\n", name)),
        }
        context.push_str("    Columns:\n");
        for column in columns {
            context.push_str(&format!("      * {} ({})", column.name, column.data_type));
            if with_constraints {
                if column.is_primary_key {
                    context.push_str(" [PRIMARY KEY]");
                }
                if !column.is_nullable {
                    context.push_str(" [NOT NULL]");
                }
            }
            context.push('\n');
        }
    }
}
