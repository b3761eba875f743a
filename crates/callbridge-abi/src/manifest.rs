//! Generator manifests
//!
//! A manifest enumerates the signatures a program actually bridges, plus the
//! layouts of the value types they mention. The generator classifies every
//! method and emits one trampoline set per distinct shape.
//!
//! ```toml
//! target = "aarch64"
//!
//! [structs.Vector3]
//! size = 12
//! fields = [
//!     { offset = 0, type = "f32" },
//!     { offset = 4, type = "f32" },
//!     { offset = 8, type = "f32" },
//! ]
//!
//! [[methods]]
//! name = "Physics::Raycast"
//! ret = "bool"
//! params = ["Vector3", "Vector3", "f32"]
//!
//! [[methods]]
//! name = "Transform::Translate"
//! instance = true
//! params = ["Vector3"]
//! ```
//!
//! Primitive names: `void bool char i8 u8 i16 u16 i32 u32 i64 u64 isize
//! usize f32 f64 object string ptr ref fnptr`.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

use serde::Deserialize;

use crate::error::ManifestError;
use crate::target::TargetAbi;
use crate::types::{FieldLayout, MethodSignature, StructLayout, ValueType};

/// Parsed manifest document.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Manifest {
    /// Target ABI; the generator's command line may override it
    #[serde(default)]
    pub target: Option<TargetAbi>,

    /// Value type layouts, by name
    #[serde(default)]
    pub structs: BTreeMap<String, StructDecl>,

    /// Bridged methods
    #[serde(default)]
    pub methods: Vec<MethodDecl>,
}

/// `[structs.<Name>]` table
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct StructDecl {
    pub size: u32,
    #[serde(default)]
    pub fields: Vec<FieldDecl>,
}

/// One struct field
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FieldDecl {
    pub offset: u32,
    #[serde(rename = "type")]
    pub ty: String,
}

/// `[[methods]]` entry
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct MethodDecl {
    pub name: String,
    #[serde(default = "default_ret")]
    pub ret: String,
    #[serde(default)]
    pub params: Vec<String>,
    /// Instance methods receive an implicit leading object parameter
    #[serde(default)]
    pub instance: bool,
}

fn default_ret() -> String {
    "void".to_string()
}

/// A manifest method with all type names resolved.
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedMethod {
    pub name: String,
    pub signature: MethodSignature,
}

impl Manifest {
    /// Parse a TOML manifest.
    pub fn from_toml_str(source: &str) -> Result<Self, ManifestError> {
        Ok(toml::from_str(source)?)
    }

    /// Resolve every method's type names against primitives and the
    /// declared structs.
    pub fn resolve(&self) -> Result<Vec<ResolvedMethod>, ManifestError> {
        let mut resolver = Resolver {
            decls: &self.structs,
            done: BTreeMap::new(),
            visiting: BTreeSet::new(),
        };

        self.methods
            .iter()
            .map(|method| {
                let context = format!("method `{}`", method.name);
                let ret = resolver.resolve(&method.ret, &context)?;
                let params = method
                    .params
                    .iter()
                    .map(|name| resolver.resolve(name, &context))
                    .collect::<Result<Vec<_>, _>>()?;
                let mut signature = MethodSignature::new(ret, params);
                if method.instance {
                    signature = signature.with_receiver();
                }
                Ok(ResolvedMethod {
                    name: method.name.clone(),
                    signature,
                })
            })
            .collect()
    }
}

/// Primitive type for a manifest name.
pub fn primitive(name: &str) -> Option<ValueType> {
    let ty = match name {
        "void" => ValueType::Void,
        "bool" => ValueType::Bool,
        "char" => ValueType::Char,
        "i8" => ValueType::I1,
        "u8" => ValueType::U1,
        "i16" => ValueType::I2,
        "u16" => ValueType::U2,
        "i32" => ValueType::I4,
        "u32" => ValueType::U4,
        "i64" => ValueType::I8,
        "u64" => ValueType::U8,
        "isize" => ValueType::IntPtr,
        "usize" => ValueType::UIntPtr,
        "f32" => ValueType::R4,
        "f64" => ValueType::R8,
        "object" | "string" => ValueType::Object,
        "ptr" => ValueType::Pointer,
        "ref" => ValueType::ByRef,
        "fnptr" => ValueType::FnPtr,
        _ => return None,
    };
    Some(ty)
}

struct Resolver<'a> {
    decls: &'a BTreeMap<String, StructDecl>,
    done: BTreeMap<String, Arc<StructLayout>>,
    visiting: BTreeSet<String>,
}

impl Resolver<'_> {
    fn resolve(&mut self, name: &str, context: &str) -> Result<ValueType, ManifestError> {
        if let Some(ty) = primitive(name) {
            return Ok(ty);
        }
        if let Some(layout) = self.done.get(name) {
            return Ok(ValueType::Struct(Arc::clone(layout)));
        }
        let decls = self.decls;
        let decl = decls.get(name).ok_or_else(|| ManifestError::UnknownType {
            name: name.to_string(),
            context: context.to_string(),
        })?;
        if !self.visiting.insert(name.to_string()) {
            return Err(ManifestError::RecursiveStruct {
                name: name.to_string(),
            });
        }

        let field_context = format!("struct `{}`", name);
        let fields = decl
            .fields
            .iter()
            .map(|field| {
                Ok(FieldLayout {
                    offset: field.offset,
                    ty: self.resolve(&field.ty, &field_context)?,
                })
            })
            .collect::<Result<Vec<_>, ManifestError>>()?;

        self.visiting.remove(name);
        let layout = Arc::new(StructLayout {
            name: name.to_string(),
            size: decl.size,
            fields,
        });
        self.done.insert(name.to_string(), Arc::clone(&layout));
        Ok(ValueType::Struct(layout))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"
target = "aarch64"

[structs.Vector3]
size = 12
fields = [
    { offset = 0, type = "f32" },
    { offset = 4, type = "f32" },
    { offset = 8, type = "f32" },
]

[structs.Ray]
size = 24
fields = [
    { offset = 0, type = "Vector3" },
    { offset = 12, type = "Vector3" },
]

[[methods]]
name = "Physics::Raycast"
ret = "bool"
params = ["Ray", "f32"]

[[methods]]
name = "Transform::Translate"
instance = true
params = ["Vector3"]
"#;

    #[test]
    fn test_parse_and_resolve() {
        let manifest = Manifest::from_toml_str(SAMPLE).unwrap();
        assert_eq!(manifest.target, Some(TargetAbi::Aapcs64));
        let methods = manifest.resolve().unwrap();
        assert_eq!(methods.len(), 2);

        let raycast = &methods[0].signature;
        assert_eq!(raycast.ret, ValueType::Bool);
        match &raycast.params[0] {
            ValueType::Struct(layout) => {
                assert_eq!(layout.name, "Ray");
                assert_eq!(layout.leaves().len(), 6);
            }
            other => panic!("expected struct, got {:?}", other),
        }

        let translate = &methods[1].signature;
        assert_eq!(translate.ret, ValueType::Void);
        assert_eq!(translate.params[0], ValueType::Object);
        assert_eq!(translate.params.len(), 2);
    }

    #[test]
    fn test_unknown_type() {
        let manifest = Manifest::from_toml_str(
            r#"
[[methods]]
name = "Foo"
params = ["Quaternion"]
"#,
        )
        .unwrap();
        let err = manifest.resolve().unwrap_err();
        assert!(err.to_string().contains("Quaternion"));
        assert!(err.to_string().contains("Foo"));
    }

    #[test]
    fn test_recursive_struct() {
        let manifest = Manifest::from_toml_str(
            r#"
[structs.Node]
size = 16
fields = [{ offset = 0, type = "Node" }]

[[methods]]
name = "Walk"
params = ["Node"]
"#,
        )
        .unwrap();
        assert!(matches!(
            manifest.resolve(),
            Err(ManifestError::RecursiveStruct { .. })
        ));
    }

    #[test]
    fn test_unknown_field_rejected() {
        let err = Manifest::from_toml_str("[[methods]]\nname = \"A\"\nretrun = \"i32\"\n");
        assert!(matches!(err, Err(ManifestError::Parse(_))));
    }
}
