//! A resident module: its decoded tables plus the lookup indexes the type model needs.
//!
//! The tables of a module are immutable once loaded, so every index is computed once when the
//! module is created. Row numbers handed out by [`Module`] are one-based, matching tokens.

use std::{
    collections::HashMap,
    fmt,
    path::{Path, PathBuf},
    sync::{
        atomic::{AtomicU64, Ordering},
        Arc,
    },
};

use crate::{
    file::File,
    metadata::{
        constant::ConstantValue,
        flags::MethodSemanticsAttributes,
        root::DEFAULT_VERSION,
        tables::{
            reader::read_metadata, row, AssemblyRefRow, GenericParamRow, MetadataTables,
            TableId, TypeDefRow, TypeRefRow,
        },
        token::Token,
    },
    Result,
};

/// A reference counted module
pub type ModuleRc = Arc<Module>;

static NEXT_MODULE_ID: AtomicU64 = AtomicU64::new(1);

/// Process-unique identity of a resident module.
///
/// Ids are never reused, so a handle that names a module which has since been dropped can not be
/// confused with a module loaded later from the same file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ModuleId(u64);

impl ModuleId {
    fn next() -> Self {
        ModuleId(NEXT_MODULE_ID.fetch_add(1, Ordering::Relaxed))
    }

    /// The raw id value
    #[must_use]
    pub fn value(self) -> u64 {
        self.0
    }
}

impl fmt::Display for ModuleId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "module#{}", self.0)
    }
}

#[derive(Default)]
struct Indexes {
    top_level: HashMap<(String, String), u32>,
    enclosing: HashMap<u32, u32>,
    nested: HashMap<u32, Vec<u32>>,
    member_owner: HashMap<Token, u32>,
    generic_params: HashMap<Token, Vec<u32>>,
    constraints: HashMap<u32, Vec<Token>>,
    interfaces: HashMap<u32, Vec<Token>>,
    semantics: HashMap<u32, (MethodSemanticsAttributes, Token)>,
    accessors: HashMap<Token, Vec<(MethodSemanticsAttributes, u32)>>,
    method_impls: HashMap<u32, Vec<(Token, Token)>>,
    constants: HashMap<Token, ConstantValue>,
    attributes: HashMap<Token, Vec<(String, String)>>,
}

/// A module resident for metadata inspection.
///
/// Modules are created from a file ([`Module::from_path`]), from an image in memory
/// ([`Module::from_bytes`]) or directly from tables ([`Module::from_tables`], used by
/// [`crate::metadata::builder::ModuleBuilder`]). Nothing in a module is ever executed.
pub struct Module {
    id: ModuleId,
    path: Option<PathBuf>,
    version: String,
    tables: MetadataTables,
    indexes: Indexes,
}

impl Module {
    /// Loads the module at `path`.
    ///
    /// # Errors
    /// Returns [`crate::Error::FileError`] if the file can not be read and the decoding errors of
    /// [`Module::from_bytes`] if it is not a valid module.
    #[tracing::instrument(level = "debug", skip_all, fields(path = %path.as_ref().display()))]
    pub fn from_path(path: impl AsRef<Path>) -> Result<ModuleRc> {
        let path = path.as_ref();
        let file = File::from_file(path)?;
        let read = read_metadata(file.metadata()?)?;

        let module = Self::create(read.tables, read.version, Some(path.to_path_buf()))?;
        tracing::debug!(id = %module.id, name = module.name(), "loaded module");
        Ok(module)
    }

    /// Loads a module from a PE or bare metadata image held in memory.
    ///
    /// # Errors
    /// Returns [`crate::Error::Empty`], [`crate::Error::NotSupported`],
    /// [`crate::Error::Malformed`] or [`crate::Error::OutOfBounds`] for images that can not be
    /// decoded.
    pub fn from_bytes(data: Vec<u8>) -> Result<ModuleRc> {
        let file = File::from_mem(data)?;
        let read = read_metadata(file.metadata()?)?;

        Self::create(read.tables, read.version, None)
    }

    /// Creates a module from decoded tables.
    ///
    /// # Errors
    /// Returns [`crate::Error::Malformed`] if the tables have no `Module` row or a constant
    /// value can not be decoded.
    pub fn from_tables(tables: MetadataTables) -> Result<ModuleRc> {
        Self::create(tables, DEFAULT_VERSION.to_string(), None)
    }

    fn create(tables: MetadataTables, version: String, path: Option<PathBuf>) -> Result<ModuleRc> {
        if tables.module.is_empty() {
            return Err(malformed_error!("Metadata does not contain a Module row"));
        }

        let indexes = Self::index(&tables)?;
        Ok(Arc::new(Module {
            id: ModuleId::next(),
            path,
            version,
            tables,
            indexes,
        }))
    }

    fn index(tables: &MetadataTables) -> Result<Indexes> {
        let mut indexes = Indexes::default();

        for nested in &tables.nested_class {
            indexes.enclosing.insert(nested.nested, nested.enclosing);
            indexes
                .nested
                .entry(nested.enclosing)
                .or_default()
                .push(nested.nested);
        }

        #[allow(clippy::cast_possible_truncation)]
        for (index, type_def) in tables.type_def.iter().enumerate() {
            let type_row = index as u32 + 1;
            if !indexes.enclosing.contains_key(&type_row) {
                indexes
                    .top_level
                    .entry((type_def.namespace.clone(), type_def.name.clone()))
                    .or_insert(type_row);
            }

            let owned = [
                (TableId::Field, tables.fields_of(type_row)),
                (TableId::MethodDef, tables.methods_of(type_row)),
                (TableId::Property, tables.properties_of(type_row)),
                (TableId::Event, tables.events_of(type_row)),
            ];
            for (table, rows) in owned {
                for member in rows {
                    indexes
                        .member_owner
                        .insert(Token::from_parts(table, member), type_row);
                }
            }
        }

        #[allow(clippy::cast_possible_truncation)]
        for (index, param) in tables.generic_param.iter().enumerate() {
            indexes
                .generic_params
                .entry(param.owner)
                .or_default()
                .push(index as u32 + 1);
        }
        for params in indexes.generic_params.values_mut() {
            params.sort_by_key(|param| row(&tables.generic_param, *param).map(|p| p.number));
        }

        for constraint in &tables.generic_param_constraint {
            indexes
                .constraints
                .entry(constraint.owner)
                .or_default()
                .push(constraint.constraint);
        }

        for interface in &tables.interface_impl {
            indexes
                .interfaces
                .entry(interface.class)
                .or_default()
                .push(interface.interface);
        }

        for semantics in &tables.method_semantics {
            indexes
                .semantics
                .insert(semantics.method, (semantics.semantics, semantics.association));
            indexes
                .accessors
                .entry(semantics.association)
                .or_default()
                .push((semantics.semantics, semantics.method));
        }

        for method_impl in &tables.method_impl {
            indexes
                .method_impls
                .entry(method_impl.class)
                .or_default()
                .push((method_impl.body, method_impl.declaration));
        }

        for constant in &tables.constant {
            let value = ConstantValue::decode(constant.element_type, &constant.value)?;
            indexes.constants.insert(constant.parent, value);
        }

        for attribute in &tables.custom_attribute {
            if let Some(name) = Self::attribute_type(tables, &indexes, attribute.constructor) {
                indexes
                    .attributes
                    .entry(attribute.parent)
                    .or_default()
                    .push(name);
            }
        }

        Ok(indexes)
    }

    /// Namespace and name of the type declaring the attribute constructor `ctor`
    fn attribute_type(
        tables: &MetadataTables,
        indexes: &Indexes,
        ctor: Token,
    ) -> Option<(String, String)> {
        let class = match ctor.table_id()? {
            TableId::MethodDef => {
                let owner = indexes.member_owner.get(&ctor)?;
                Token::from_parts(TableId::TypeDef, *owner)
            }
            TableId::MemberRef => row(&tables.member_ref, ctor.row())?.class,
            _ => return None,
        };

        match class.table_id()? {
            TableId::TypeDef => {
                let type_def = row(&tables.type_def, class.row())?;
                Some((type_def.namespace.clone(), type_def.name.clone()))
            }
            TableId::TypeRef => {
                let type_ref = row(&tables.type_ref, class.row())?;
                Some((type_ref.namespace.clone(), type_ref.name.clone()))
            }
            _ => None,
        }
    }

    /// The process-unique id of this module
    #[must_use]
    pub fn id(&self) -> ModuleId {
        self.id
    }

    /// The file this module was loaded from, if any
    #[must_use]
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// Runtime version string of the metadata root
    #[must_use]
    pub fn version(&self) -> &str {
        &self.version
    }

    /// The decoded tables
    #[must_use]
    pub fn tables(&self) -> &MetadataTables {
        &self.tables
    }

    /// Name of the module file, as recorded in the `Module` row
    #[must_use]
    pub fn name(&self) -> &str {
        self.tables
            .module
            .first()
            .map_or("", |module| module.name.as_str())
    }

    /// Name of the assembly this module belongs to.
    ///
    /// Modules without an `Assembly` row report their file name without extension.
    #[must_use]
    pub fn assembly_name(&self) -> &str {
        if let Some(assembly) = self.tables.assembly.first() {
            return &assembly.name;
        }
        let name = self.name();
        Path::new(name)
            .file_stem()
            .and_then(|stem| stem.to_str())
            .unwrap_or(name)
    }

    /// The module version id
    #[must_use]
    pub fn mvid(&self) -> uguid::Guid {
        self.tables
            .module
            .first()
            .map_or(uguid::Guid::ZERO, |module| module.mvid)
    }

    /// Assemblies this module references
    #[must_use]
    pub fn assembly_refs(&self) -> &[AssemblyRefRow] {
        &self.tables.assembly_ref
    }

    /// Number of type definitions, nested types included
    #[must_use]
    pub fn type_count(&self) -> u32 {
        u32::try_from(self.tables.type_def.len()).unwrap_or(u32::MAX)
    }

    /// The one-based TypeDef `row`
    #[must_use]
    pub fn type_def(&self, row_index: u32) -> Option<&TypeDefRow> {
        row(&self.tables.type_def, row_index)
    }

    /// The one-based TypeRef `row`
    #[must_use]
    pub fn type_ref(&self, row_index: u32) -> Option<&TypeRefRow> {
        row(&self.tables.type_ref, row_index)
    }

    /// The one-based GenericParam `row`
    #[must_use]
    pub fn generic_param(&self, row_index: u32) -> Option<&GenericParamRow> {
        row(&self.tables.generic_param, row_index)
    }

    /// Finds a top-level type definition by namespace and name.
    #[must_use]
    pub fn find_type(&self, namespace: &str, name: &str) -> Option<u32> {
        self.indexes
            .top_level
            .get(&(namespace.to_string(), name.to_string()))
            .copied()
    }

    /// Finds the type nested directly in `enclosing` called `name`.
    #[must_use]
    pub fn find_nested(&self, enclosing: u32, name: &str) -> Option<u32> {
        self.nested_types(enclosing)
            .iter()
            .copied()
            .find(|nested| self.type_def(*nested).is_some_and(|row| row.name == name))
    }

    /// Finds a type by its full name, with `+` separating nested types from their enclosing
    /// type (`Namespace.Outer+Inner`).
    #[must_use]
    pub fn find_type_by_full_name(&self, full_name: &str) -> Option<u32> {
        let mut parts = full_name.split('+');
        let outer = parts.next()?;
        let (namespace, name) = outer.rsplit_once('.').unwrap_or(("", outer));

        let mut current = self.find_type(namespace, name)?;
        for nested in parts {
            current = self.find_nested(current, nested)?;
        }
        Some(current)
    }

    /// Full name of the TypeDef `row_index`, nested types joined with `+`
    #[must_use]
    pub fn type_full_name(&self, row_index: u32) -> String {
        let Some(type_def) = self.type_def(row_index) else {
            return String::new();
        };
        match self.enclosing_type(row_index) {
            Some(enclosing) => format!("{}+{}", self.type_full_name(enclosing), type_def.name),
            None if type_def.namespace.is_empty() => type_def.name.clone(),
            None => format!("{}.{}", type_def.namespace, type_def.name),
        }
    }

    /// The type `row_index` is nested in
    #[must_use]
    pub fn enclosing_type(&self, row_index: u32) -> Option<u32> {
        self.indexes.enclosing.get(&row_index).copied()
    }

    /// Types nested directly in `row_index`, in NestedClass order
    #[must_use]
    pub fn nested_types(&self, row_index: u32) -> &[u32] {
        self.indexes
            .nested
            .get(&row_index)
            .map_or(&[], Vec::as_slice)
    }

    /// TypeDef row declaring the field, method, property or event `member`
    #[must_use]
    pub fn declaring_type(&self, member: Token) -> Option<u32> {
        self.indexes.member_owner.get(&member).copied()
    }

    /// GenericParam rows of the TypeDef or MethodDef `owner`, ordered by number
    #[must_use]
    pub fn generic_params(&self, owner: Token) -> &[u32] {
        self.indexes
            .generic_params
            .get(&owner)
            .map_or(&[], Vec::as_slice)
    }

    /// Type constraints of the GenericParam `param_row`
    #[must_use]
    pub fn constraints(&self, param_row: u32) -> &[Token] {
        self.indexes
            .constraints
            .get(&param_row)
            .map_or(&[], Vec::as_slice)
    }

    /// Interfaces declared directly on the TypeDef `type_row`
    #[must_use]
    pub fn interfaces(&self, type_row: u32) -> &[Token] {
        self.indexes
            .interfaces
            .get(&type_row)
            .map_or(&[], Vec::as_slice)
    }

    /// The property or event the MethodDef `method_row` is an accessor of
    #[must_use]
    pub fn semantics(&self, method_row: u32) -> Option<(MethodSemanticsAttributes, Token)> {
        self.indexes.semantics.get(&method_row).copied()
    }

    /// Accessor methods of the property or event `association`
    #[must_use]
    pub fn accessors(&self, association: Token) -> &[(MethodSemanticsAttributes, u32)] {
        self.indexes
            .accessors
            .get(&association)
            .map_or(&[], Vec::as_slice)
    }

    /// `(body, declaration)` pairs of the MethodImpl rows of `type_row`
    #[must_use]
    pub fn method_impls(&self, type_row: u32) -> &[(Token, Token)] {
        self.indexes
            .method_impls
            .get(&type_row)
            .map_or(&[], Vec::as_slice)
    }

    /// The constant of a field, parameter or property
    #[must_use]
    pub fn constant(&self, parent: Token) -> Option<&ConstantValue> {
        self.indexes.constants.get(&parent)
    }

    /// Returns true if `parent` carries a custom attribute of type `namespace.name`
    #[must_use]
    pub fn has_attribute(&self, parent: Token, namespace: &str, name: &str) -> bool {
        self.indexes.attributes.get(&parent).is_some_and(|types| {
            types
                .iter()
                .any(|(ns, n)| ns.as_str() == namespace && n.as_str() == name)
        })
    }
}

impl fmt::Debug for Module {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Module")
            .field("id", &self.id)
            .field("name", &self.name())
            .field("assembly", &self.assembly_name())
            .field("types", &self.tables.type_def.len())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metadata::{
        builder::{FieldBuilder, MethodBuilder, ModuleBuilder, TypeBuilder},
        flags::TypeAttributes,
        signatures::TypeSignature,
    };

    fn sample() -> ModuleRc {
        let mut module = ModuleBuilder::new("Sample");
        let outer = TypeBuilder::class("N", "Outer`1")
            .generic_parameter("T")
            .build(&mut module)
            .unwrap();
        let inner = TypeBuilder::class("", "Inner")
            .nested_in(outer)
            .build(&mut module)
            .unwrap();
        FieldBuilder::new("Count", TypeSignature::I4)
            .build(&mut module, inner)
            .unwrap();
        MethodBuilder::new("Run").build(&mut module, outer).unwrap();
        module.build().unwrap()
    }

    #[test]
    fn names_and_identity() {
        let module = sample();
        assert_eq!(module.name(), "Sample.dll");
        assert_eq!(module.assembly_name(), "Sample");
        assert_eq!(module.version(), DEFAULT_VERSION);
        assert_ne!(module.mvid(), uguid::Guid::ZERO);

        let other = sample();
        assert_ne!(module.id(), other.id());
        assert_eq!(module.mvid(), other.mvid());
    }

    #[test]
    fn type_lookup() {
        let module = sample();
        let outer = module.find_type("N", "Outer`1").unwrap();
        let inner = module.find_nested(outer, "Inner").unwrap();

        assert_eq!(module.find_type_by_full_name("N.Outer`1+Inner"), Some(inner));
        assert_eq!(module.find_type_by_full_name("N.Outer`1+Missing"), None);
        assert_eq!(module.find_type("", "Inner"), None);
        assert_eq!(module.enclosing_type(inner), Some(outer));
        assert_eq!(module.type_full_name(inner), "N.Outer`1+Inner");
        assert!(module
            .type_def(inner)
            .unwrap()
            .flags
            .contains(TypeAttributes::NESTED_PUBLIC));
    }

    #[test]
    fn member_owners() {
        let module = sample();
        let outer = module.find_type("N", "Outer`1").unwrap();
        let inner = module.find_nested(outer, "Inner").unwrap();

        let field = Token::from_parts(TableId::Field, module.tables().fields_of(inner)[0]);
        let method = Token::from_parts(TableId::MethodDef, module.tables().methods_of(outer)[0]);
        assert_eq!(module.declaring_type(field), Some(inner));
        assert_eq!(module.declaring_type(method), Some(outer));

        // Nested types redeclare the generic parameters of their enclosing type
        let params = module.generic_params(Token::from_parts(TableId::TypeDef, inner));
        assert_eq!(params.len(), 1);
        assert_eq!(module.generic_param(params[0]).unwrap().name, "T");
    }

    #[test]
    fn missing_module_row() {
        assert!(Module::from_tables(MetadataTables::default()).is_err());
    }

    #[test]
    fn bytes_round_trip() {
        let mut module = ModuleBuilder::new("Bytes");
        TypeBuilder::class("N", "C").build(&mut module).unwrap();
        let loaded = Module::from_bytes(module.to_bytes().unwrap()).unwrap();

        assert_eq!(loaded.assembly_name(), "Bytes");
        assert!(loaded.find_type("N", "C").is_some());
        assert!(Module::from_bytes(vec![0x01, 0x02, 0x03]).is_err());
    }
}
