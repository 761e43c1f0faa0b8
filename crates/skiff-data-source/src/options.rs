use arrow::datatypes::SchemaRef;
use skiff_common::config::AppConfig;

/// Options for reading CSV files, mirroring the usual reader settings
/// (`header`, `inferSchema`, `delimiter`, explicit schema).
#[derive(Debug, Clone)]
pub struct CsvReadOptions {
    /// Whether the first line holds column names.
    pub header: bool,
    /// Whether to infer column types by scanning the file. When `false`
    /// and no explicit schema is given, every column reads as a string.
    pub infer_schema: bool,
    pub delimiter: u8,
    /// An explicit schema; takes precedence over inference.
    pub schema: Option<SchemaRef>,
    /// Upper bound on the number of records scanned for inference.
    pub schema_infer_max_records: usize,
}

impl Default for CsvReadOptions {
    fn default() -> Self {
        let config = AppConfig::default();
        CsvReadOptions {
            header: false,
            infer_schema: false,
            delimiter: b',',
            schema: None,
            schema_infer_max_records: config.io.schema_infer_max_records,
        }
    }
}

impl CsvReadOptions {
    pub fn from_config(config: &AppConfig) -> Self {
        CsvReadOptions {
            schema_infer_max_records: config.io.schema_infer_max_records,
            ..CsvReadOptions::default()
        }
    }

    pub fn with_header(mut self, header: bool) -> Self {
        self.header = header;
        self
    }

    pub fn with_infer_schema(mut self, infer_schema: bool) -> Self {
        self.infer_schema = infer_schema;
        self
    }

    pub fn with_delimiter(mut self, delimiter: u8) -> Self {
        self.delimiter = delimiter;
        self
    }

    pub fn with_schema(mut self, schema: SchemaRef) -> Self {
        self.schema = Some(schema);
        self
    }
}

#[derive(Debug, Clone)]
pub struct CsvWriteOptions {
    pub header: bool,
    pub delimiter: u8,
}

impl Default for CsvWriteOptions {
    fn default() -> Self {
        CsvWriteOptions {
            header: true,
            delimiter: b',',
        }
    }
}

/// Options for reading newline-delimited JSON files.
#[derive(Debug, Clone)]
pub struct JsonReadOptions {
    /// An explicit schema; takes precedence over inference.
    pub schema: Option<SchemaRef>,
    pub schema_infer_max_records: usize,
}

impl Default for JsonReadOptions {
    fn default() -> Self {
        let config = AppConfig::default();
        JsonReadOptions {
            schema: None,
            schema_infer_max_records: config.io.schema_infer_max_records,
        }
    }
}

impl JsonReadOptions {
    pub fn from_config(config: &AppConfig) -> Self {
        JsonReadOptions {
            schema_infer_max_records: config.io.schema_infer_max_records,
            ..JsonReadOptions::default()
        }
    }

    pub fn with_schema(mut self, schema: SchemaRef) -> Self {
        self.schema = Some(schema);
        self
    }
}
