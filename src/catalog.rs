//! The catalog tracks every table available to the database: its name, id,
//! backing heap file, schema, and primary key.
//!
//! Both maps (name to id, id to table entry) live behind a single registry
//! lock, so replace-by-name registration is one atomic critical section and
//! readers can never observe the maps out of sync.

use crate::access::schema::Schema;
use crate::access::value::FieldType;
use crate::error::{DbError, DbResult};
use crate::storage::heap_file::HeapFile;
use log::info;
use parking_lot::RwLock;
use std::collections::HashMap;
use std::fs;
use std::path::Path;
use std::sync::Arc;

/// A table's identity, assigned by its heap file at open time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TableId(pub u32);

impl std::fmt::Display for TableId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

struct TableEntry {
    file: Arc<HeapFile>,
    name: String,
    primary_key: String,
}

#[derive(Default)]
struct Registry {
    by_name: HashMap<String, TableId>,
    by_id: HashMap<TableId, TableEntry>,
}

/// Registry of all tables, keyed both by name and by id.
pub struct Catalog {
    registry: RwLock<Registry>,
}

impl Catalog {
    pub fn new() -> Self {
        Self {
            registry: RwLock::new(Registry::default()),
        }
    }

    /// Register `file` under `name` with the given primary-key field.
    ///
    /// Replace-by-name: if `name` is already registered, the old id and file
    /// binding are evicted first and that id becomes unresolvable. Returns
    /// the new table id.
    pub fn add_table(&self, file: Arc<HeapFile>, name: &str, primary_key: &str) -> TableId {
        let id = file.id();
        let mut registry = self.registry.write();
        if let Some(old_id) = registry.by_name.remove(name) {
            registry.by_id.remove(&old_id);
        }
        registry.by_name.insert(name.to_string(), id);
        registry.by_id.insert(
            id,
            TableEntry {
                file,
                name: name.to_string(),
                primary_key: primary_key.to_string(),
            },
        );
        id
    }

    /// Register `file` under `name` with no primary key.
    pub fn add_table_unkeyed(&self, file: Arc<HeapFile>, name: &str) -> TableId {
        self.add_table(file, name, "")
    }

    /// Register `file` under a freshly generated unique name.
    pub fn add_table_anonymous(&self, file: Arc<HeapFile>) -> TableId {
        let mut registry = self.registry.write();
        let name = loop {
            let candidate = format!("table_{:08x}", rand::random::<u32>());
            if !registry.by_name.contains_key(&candidate) {
                break candidate;
            }
        };
        let id = file.id();
        registry.by_name.insert(name.clone(), id);
        registry.by_id.insert(
            id,
            TableEntry {
                file,
                name,
                primary_key: String::new(),
            },
        );
        id
    }

    pub fn table_id(&self, name: &str) -> DbResult<TableId> {
        self.registry
            .read()
            .by_name
            .get(name)
            .copied()
            .ok_or_else(|| DbError::NoSuchTable(name.to_string()))
    }

    pub fn table_name(&self, id: TableId) -> DbResult<String> {
        self.with_entry(id, |entry| entry.name.clone())
    }

    pub fn schema(&self, id: TableId) -> DbResult<Arc<Schema>> {
        self.with_entry(id, |entry| entry.file.schema().clone())
    }

    pub fn file(&self, id: TableId) -> DbResult<Arc<HeapFile>> {
        self.with_entry(id, |entry| entry.file.clone())
    }

    pub fn primary_key(&self, id: TableId) -> DbResult<String> {
        self.with_entry(id, |entry| entry.primary_key.clone())
    }

    /// Ids of all registered tables, in no particular order.
    pub fn table_ids(&self) -> Vec<TableId> {
        self.registry.read().by_id.keys().copied().collect()
    }

    /// Remove every table from the catalog.
    pub fn clear(&self) {
        let mut registry = self.registry.write();
        registry.by_name.clear();
        registry.by_id.clear();
    }

    fn with_entry<T>(&self, id: TableId, f: impl FnOnce(&TableEntry) -> T) -> DbResult<T> {
        self.registry
            .read()
            .by_id
            .get(&id)
            .map(f)
            .ok_or(DbError::NoSuchTableId(id))
    }

    /// Bootstrap tables from a line-oriented schema file.
    ///
    /// One table per line, `name (field type[ pk], ...)`, types `int` and
    /// `string` (case-insensitive), `pk` marking the primary-key field. Each
    /// table's heap file is `<name>.dat` next to the schema file. Any
    /// malformed line aborts the whole load; every line is parsed before any
    /// table is registered, so an abort leaves the catalog untouched.
    pub fn load_schema(&self, path: impl AsRef<Path>) -> DbResult<()> {
        let path = path.as_ref();
        let base_dir = match path.parent() {
            Some(dir) if !dir.as_os_str().is_empty() => dir.to_path_buf(),
            _ => Path::new(".").to_path_buf(),
        };

        let text = fs::read_to_string(path)?;
        let mut parsed = Vec::new();
        for (number, line) in text.lines().enumerate() {
            parsed.push(parse_table_line(line, number + 1)?);
        }

        for (name, schema, primary_key) in parsed {
            let schema = Arc::new(schema);
            let data_path = base_dir.join(format!("{}.dat", name));
            let file = Arc::new(HeapFile::open(data_path, schema.clone())?);
            self.add_table(file, &name, &primary_key);
            info!("added table {} with schema {}", name, schema);
        }
        Ok(())
    }
}

impl Default for Catalog {
    fn default() -> Self {
        Self::new()
    }
}

fn schema_load_error(line: usize, message: impl Into<String>) -> DbError {
    DbError::SchemaLoad {
        line,
        message: message.into(),
    }
}

/// Parse one `name (field type[ pk], ...)` line into a table definition.
fn parse_table_line(line: &str, number: usize) -> DbResult<(String, Schema, String)> {
    let open = line
        .find('(')
        .ok_or_else(|| schema_load_error(number, "missing '('"))?;
    let close = line
        .rfind(')')
        .filter(|close| *close > open)
        .ok_or_else(|| schema_load_error(number, "missing ')'"))?;

    let name = line[..open].trim().to_string();
    let field_list = &line[open + 1..close];

    let mut types = Vec::new();
    let mut names = Vec::new();
    let mut primary_key = String::new();
    for field in field_list.split(',') {
        let tokens: Vec<&str> = field.split_whitespace().collect();
        let (field_name, type_token) = match tokens.as_slice() {
            [name, ty] | [name, ty, _] => (*name, *ty),
            _ => {
                return Err(schema_load_error(
                    number,
                    format!("expected 'name type [pk]', got {:?}", field.trim()),
                ))
            }
        };
        let field_type = if type_token.eq_ignore_ascii_case("int") {
            FieldType::Int
        } else if type_token.eq_ignore_ascii_case("string") {
            FieldType::Text
        } else {
            return Err(schema_load_error(
                number,
                format!("unknown type {:?}", type_token),
            ));
        };
        if let [_, _, annotation] = tokens.as_slice() {
            if *annotation != "pk" {
                return Err(schema_load_error(
                    number,
                    format!("unknown annotation {:?}", annotation),
                ));
            }
            primary_key = field_name.to_string();
        }
        types.push(field_type);
        names.push(Some(field_name.to_string()));
    }

    let schema = Schema::new(types, names)
        .map_err(|e| schema_load_error(number, e.to_string()))?;
    Ok((name, schema, primary_key))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::tempdir;

    fn int_schema() -> Arc<Schema> {
        Arc::new(Schema::new(vec![FieldType::Int], vec![Some("n".to_string())]).unwrap())
    }

    fn open_file(dir: &tempfile::TempDir, name: &str) -> Arc<HeapFile> {
        Arc::new(HeapFile::open(dir.path().join(name), int_schema()).unwrap())
    }

    #[test]
    fn test_add_and_lookup() -> DbResult<()> {
        let dir = tempdir().unwrap();
        let catalog = Catalog::new();
        let file = open_file(&dir, "a.dat");
        let id = catalog.add_table(file.clone(), "users", "n");

        assert_eq!(catalog.table_id("users")?, id);
        assert_eq!(catalog.table_name(id)?, "users");
        assert_eq!(catalog.primary_key(id)?, "n");
        assert_eq!(catalog.schema(id)?, *file.schema());
        assert_eq!(catalog.file(id)?.id(), id);
        assert_eq!(catalog.table_ids(), vec![id]);
        Ok(())
    }

    #[test]
    fn test_lookups_fail_when_absent() {
        let catalog = Catalog::new();
        assert!(matches!(
            catalog.table_id("missing"),
            Err(DbError::NoSuchTable(_))
        ));
        let id = TableId(12345);
        assert!(matches!(
            catalog.table_name(id),
            Err(DbError::NoSuchTableId(_))
        ));
        assert!(matches!(catalog.schema(id), Err(DbError::NoSuchTableId(_))));
        assert!(matches!(catalog.file(id), Err(DbError::NoSuchTableId(_))));
        assert!(matches!(
            catalog.primary_key(id),
            Err(DbError::NoSuchTableId(_))
        ));
    }

    #[test]
    fn test_replace_by_name_evicts_old_id() -> DbResult<()> {
        let dir = tempdir().unwrap();
        let catalog = Catalog::new();
        let old = catalog.add_table(open_file(&dir, "a.dat"), "t", "");
        let new = catalog.add_table(open_file(&dir, "b.dat"), "t", "");

        assert_ne!(old, new);
        assert_eq!(catalog.table_id("t")?, new);
        assert!(matches!(
            catalog.file(old),
            Err(DbError::NoSuchTableId(_))
        ));
        assert!(matches!(
            catalog.table_name(old),
            Err(DbError::NoSuchTableId(_))
        ));
        assert_eq!(catalog.table_ids(), vec![new]);
        Ok(())
    }

    #[test]
    fn test_unkeyed_defaults_to_empty_primary_key() -> DbResult<()> {
        let dir = tempdir().unwrap();
        let catalog = Catalog::new();
        let id = catalog.add_table_unkeyed(open_file(&dir, "a.dat"), "t");
        assert_eq!(catalog.primary_key(id)?, "");
        Ok(())
    }

    #[test]
    fn test_anonymous_names_are_unique() -> DbResult<()> {
        let dir = tempdir().unwrap();
        let catalog = Catalog::new();
        let a = catalog.add_table_anonymous(open_file(&dir, "a.dat"));
        let b = catalog.add_table_anonymous(open_file(&dir, "b.dat"));
        assert_ne!(catalog.table_name(a)?, catalog.table_name(b)?);
        Ok(())
    }

    #[test]
    fn test_clear() {
        let dir = tempdir().unwrap();
        let catalog = Catalog::new();
        let id = catalog.add_table(open_file(&dir, "a.dat"), "t", "");
        catalog.clear();
        assert!(catalog.table_ids().is_empty());
        assert!(catalog.table_id("t").is_err());
        assert!(catalog.file(id).is_err());
    }

    fn write_schema_file(dir: &tempfile::TempDir, contents: &str) -> std::path::PathBuf {
        let path = dir.path().join("schema.txt");
        let mut f = std::fs::File::create(&path).unwrap();
        write!(f, "{}", contents).unwrap();
        path
    }

    #[test]
    fn test_load_schema_registers_tables() -> DbResult<()> {
        let dir = tempdir().unwrap();
        let path = write_schema_file(&dir, "t1 (f1 int pk, f2 string)\nt2 (a int)\n");
        let catalog = Catalog::new();
        catalog.load_schema(&path)?;

        let id = catalog.table_id("t1")?;
        let schema = catalog.schema(id)?;
        assert_eq!(schema.field_count(), 2);
        assert_eq!(schema.field_type(0)?, FieldType::Int);
        assert_eq!(schema.field_name(0)?, Some("f1"));
        assert_eq!(schema.field_type(1)?, FieldType::Text);
        assert_eq!(schema.field_name(1)?, Some("f2"));
        assert_eq!(catalog.primary_key(id)?, "f1");

        let id2 = catalog.table_id("t2")?;
        assert_eq!(catalog.primary_key(id2)?, "");

        // Data files are rooted next to the schema file.
        assert!(dir.path().join("t1.dat").exists());
        assert!(dir.path().join("t2.dat").exists());
        Ok(())
    }

    #[test]
    fn test_load_schema_case_insensitive_types() -> DbResult<()> {
        let dir = tempdir().unwrap();
        let path = write_schema_file(&dir, "t (a INT, b String)\n");
        let catalog = Catalog::new();
        catalog.load_schema(&path)?;
        let schema = catalog.schema(catalog.table_id("t")?)?;
        assert_eq!(schema.field_type(0)?, FieldType::Int);
        assert_eq!(schema.field_type(1)?, FieldType::Text);
        Ok(())
    }

    #[test]
    fn test_load_schema_unknown_type_aborts() {
        let dir = tempdir().unwrap();
        let path = write_schema_file(&dir, "t1 (f1 int)\nt2 (f1 float)\n");
        let catalog = Catalog::new();
        let result = catalog.load_schema(&path);
        assert!(matches!(
            result,
            Err(DbError::SchemaLoad { line: 2, .. })
        ));
        // Fail-fast with nothing registered, not even the valid first line.
        assert!(catalog.table_ids().is_empty());
    }

    #[test]
    fn test_load_schema_unknown_annotation_aborts() {
        let dir = tempdir().unwrap();
        let path = write_schema_file(&dir, "t1 (f1 int primary)\n");
        let catalog = Catalog::new();
        assert!(matches!(
            catalog.load_schema(&path),
            Err(DbError::SchemaLoad { line: 1, .. })
        ));
    }

    #[test]
    fn test_load_schema_malformed_line_aborts() {
        let dir = tempdir().unwrap();
        let catalog = Catalog::new();

        let missing_paren = write_schema_file(&dir, "t1 f1 int\n");
        assert!(matches!(
            catalog.load_schema(&missing_paren),
            Err(DbError::SchemaLoad { line: 1, .. })
        ));

        let bad_field = write_schema_file(&dir, "t1 (f1)\n");
        assert!(matches!(
            catalog.load_schema(&bad_field),
            Err(DbError::SchemaLoad { line: 1, .. })
        ));
    }

    #[test]
    fn test_load_schema_missing_file() {
        let dir = tempdir().unwrap();
        let catalog = Catalog::new();
        let result = catalog.load_schema(dir.path().join("absent.txt"));
        assert!(matches!(result, Err(DbError::Io(_))));
    }

    #[test]
    fn test_load_schema_last_pk_wins() -> DbResult<()> {
        let dir = tempdir().unwrap();
        let path = write_schema_file(&dir, "t (a int pk, b int pk)\n");
        let catalog = Catalog::new();
        catalog.load_schema(&path)?;
        assert_eq!(catalog.primary_key(catalog.table_id("t")?)?, "b");
        Ok(())
    }
}
