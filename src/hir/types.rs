//! Type metadata: what the oracle reports about a type and its members.
//!
//! Types are identified by qualified name. Generic signatures are kept as
//! [`TypeSignature`] trees and substituted against a [`ResolvedType`]'s
//! arguments when a member is looked up.

use std::fmt;
use std::sync::Arc;

use smol_str::SmolStr;

use crate::base::Span;

// ============================================================================
// SIGNATURES
// ============================================================================

/// A (possibly generic, possibly array) type reference such as
/// `java.util.Map<java.lang.String, org.acme.Item>` or `int[]`.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct TypeSignature {
    pub name: SmolStr,
    pub args: Vec<TypeSignature>,
    pub array_dims: u8,
}

impl TypeSignature {
    pub fn simple(name: impl Into<SmolStr>) -> Self {
        Self {
            name: name.into(),
            args: Vec::new(),
            array_dims: 0,
        }
    }

    pub fn with_args(mut self, args: Vec<TypeSignature>) -> Self {
        self.args = args;
        self
    }

    /// Parse a signature. Malformed input degrades to a best-effort name.
    ///
    /// Wildcards keep their bound (`? extends T` is `T`); an unbounded `?`
    /// is `java.lang.Object`.
    pub fn parse(text: &str) -> Self {
        let mut text = text.trim();
        let mut array_dims = 0u8;
        while let Some(rest) = text.strip_suffix("[]") {
            text = rest.trim_end();
            array_dims = array_dims.saturating_add(1);
        }
        if let Some(varargs) = text.strip_suffix("...") {
            text = varargs.trim_end();
            array_dims = array_dims.saturating_add(1);
        }

        if let Some(bound) = text
            .strip_prefix("? extends ")
            .or_else(|| text.strip_prefix("? super "))
        {
            let mut sig = Self::parse(bound);
            sig.array_dims = sig.array_dims.saturating_add(array_dims);
            return sig;
        }
        if text == "?" {
            return Self {
                array_dims,
                ..Self::simple("java.lang.Object")
            };
        }

        let (name, args) = match text.find('<') {
            Some(open) => {
                let inner = text[open + 1..].strip_suffix('>').unwrap_or(&text[open + 1..]);
                let args = split_top_level(inner)
                    .into_iter()
                    .filter(|a| !a.trim().is_empty())
                    .map(Self::parse)
                    .collect();
                (text[..open].trim(), args)
            }
            None => (text, Vec::new()),
        };
        Self {
            name: SmolStr::new(name),
            args,
            array_dims,
        }
    }

    pub fn is_array(&self) -> bool {
        self.array_dims > 0
    }

    /// The element type of an array signature.
    pub fn array_element(&self) -> Option<TypeSignature> {
        self.is_array().then(|| TypeSignature {
            array_dims: self.array_dims - 1,
            ..self.clone()
        })
    }

    /// Name after the last `.`.
    pub fn simple_name(&self) -> &str {
        self.name.rsplit('.').next().unwrap_or(&self.name)
    }

    /// Boxed equivalent of a primitive name, if it is one.
    pub fn boxed(&self) -> Option<&'static str> {
        if self.is_array() {
            return None;
        }
        Some(match self.name.as_str() {
            "int" => "java.lang.Integer",
            "long" => "java.lang.Long",
            "short" => "java.lang.Short",
            "byte" => "java.lang.Byte",
            "double" => "java.lang.Double",
            "float" => "java.lang.Float",
            "boolean" => "java.lang.Boolean",
            "char" => "java.lang.Character",
            _ => return None,
        })
    }
}

impl fmt::Display for TypeSignature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)?;
        if !self.args.is_empty() {
            f.write_str("<")?;
            for (i, arg) in self.args.iter().enumerate() {
                if i > 0 {
                    f.write_str(", ")?;
                }
                write!(f, "{arg}")?;
            }
            f.write_str(">")?;
        }
        for _ in 0..self.array_dims {
            f.write_str("[]")?;
        }
        Ok(())
    }
}

/// Split on commas outside `<...>`.
fn split_top_level(text: &str) -> Vec<&str> {
    let mut parts = Vec::new();
    let mut depth = 0i32;
    let mut start = 0;
    for (i, c) in text.char_indices() {
        match c {
            '<' => depth += 1,
            '>' => depth -= 1,
            ',' if depth == 0 => {
                parts.push(&text[start..i]);
                start = i + 1;
            }
            _ => {}
        }
    }
    parts.push(&text[start..]);
    parts
}

// ============================================================================
// TYPE & MEMBER INFO
// ============================================================================

/// Where an external element is declared.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Location {
    pub uri: Arc<str>,
    pub span: Span,
}

/// How a member is declared.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum MemberForm {
    Field,
    Method,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ParameterInfo {
    pub name: SmolStr,
    pub ty: TypeSignature,
}

/// A field or method of a type.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MemberInfo {
    pub name: SmolStr,
    pub form: MemberForm,
    pub parameters: Vec<ParameterInfo>,
    /// Field type, or method return type.
    pub return_type: TypeSignature,
    pub declaring_type: SmolStr,
    pub doc: Option<String>,
    pub location: Option<Location>,
}

impl MemberInfo {
    pub fn field(declaring_type: &str, name: &str, ty: &str) -> Self {
        Self {
            name: SmolStr::new(name),
            form: MemberForm::Field,
            parameters: Vec::new(),
            return_type: TypeSignature::parse(ty),
            declaring_type: SmolStr::new(declaring_type),
            doc: None,
            location: None,
        }
    }

    pub fn method(declaring_type: &str, name: &str, params: &[&str], return_type: &str) -> Self {
        Self {
            name: SmolStr::new(name),
            form: MemberForm::Method,
            parameters: params
                .iter()
                .enumerate()
                .map(|(i, ty)| ParameterInfo {
                    name: SmolStr::new(format!("arg{i}")),
                    ty: TypeSignature::parse(ty),
                })
                .collect(),
            return_type: TypeSignature::parse(return_type),
            declaring_type: SmolStr::new(declaring_type),
            doc: None,
            location: None,
        }
    }

    pub fn with_doc(mut self, doc: impl Into<String>) -> Self {
        self.doc = Some(doc.into());
        self
    }

    pub fn with_location(mut self, location: Location) -> Self {
        self.location = Some(location);
        self
    }

    /// The property name a getter exposes: `getName` → `name`,
    /// `isActive` → `active`.
    pub fn getter_property(&self) -> Option<String> {
        if self.form != MemberForm::Method || !self.parameters.is_empty() {
            return None;
        }
        let rest = self
            .name
            .strip_prefix("get")
            .or_else(|| self.name.strip_prefix("is"))?;
        let mut chars = rest.chars();
        let first = chars.next()?;
        if !first.is_uppercase() {
            return None;
        }
        Some(first.to_lowercase().chain(chars).collect())
    }

    /// `name(Type, Type) : Return` for hovers and completion details.
    pub fn signature(&self) -> String {
        match self.form {
            MemberForm::Field => format!("{} : {}", self.name, self.return_type),
            MemberForm::Method => {
                let params: Vec<String> = self
                    .parameters
                    .iter()
                    .map(|p| format!("{} {}", p.ty, p.name))
                    .collect();
                format!("{}({}) : {}", self.name, params.join(", "), self.return_type)
            }
        }
    }
}

/// Metadata of one type.
#[derive(Clone, Debug, PartialEq, Eq, Default)]
pub struct TypeInfo {
    /// Qualified name.
    pub name: SmolStr,
    pub type_params: Vec<SmolStr>,
    pub super_types: Vec<TypeSignature>,
    pub members: Vec<MemberInfo>,
    pub doc: Option<String>,
    pub location: Option<Location>,
}

impl TypeInfo {
    pub fn new(name: impl Into<SmolStr>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    pub fn with_type_params(mut self, params: &[&str]) -> Self {
        self.type_params = params.iter().map(|p| SmolStr::new(p)).collect();
        self
    }

    pub fn with_super_type(mut self, signature: &str) -> Self {
        self.super_types.push(TypeSignature::parse(signature));
        self
    }

    pub fn with_field(mut self, name: &str, ty: &str) -> Self {
        let member = MemberInfo::field(&self.name, name, ty);
        self.members.push(member);
        self
    }

    pub fn with_method(mut self, name: &str, params: &[&str], return_type: &str) -> Self {
        let member = MemberInfo::method(&self.name, name, params, return_type);
        self.members.push(member);
        self
    }

    pub fn with_member(mut self, member: MemberInfo) -> Self {
        self.members.push(member);
        self
    }

    pub fn with_doc(mut self, doc: impl Into<String>) -> Self {
        self.doc = Some(doc.into());
        self
    }

    pub fn with_location(mut self, location: Location) -> Self {
        self.location = Some(location);
        self
    }

    pub fn simple_name(&self) -> &str {
        self.name.rsplit('.').next().unwrap_or(&self.name)
    }
}

/// A type together with the concrete arguments of one use site.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ResolvedType {
    pub info: Arc<TypeInfo>,
    pub args: Vec<TypeSignature>,
}

impl ResolvedType {
    pub fn new(info: Arc<TypeInfo>, args: Vec<TypeSignature>) -> Self {
        Self { info, args }
    }

    /// An array of `element`. Arrays have no oracle metadata; the
    /// synthesized type exposes `length`, `size()` and `get(int)`.
    pub fn array_of(element: TypeSignature) -> Self {
        let name = format!("{element}[]");
        let info = TypeInfo::new(name)
            .with_type_params(&["E"])
            .with_field("length", "int")
            .with_method("size", &[], "int")
            .with_method("get", &["int"], "E")
            .with_method("take", &["int"], "E[]")
            .with_method("takeLast", &["int"], "E[]");
        Self {
            info: Arc::new(info),
            args: vec![element],
        }
    }

    pub fn is_array(&self) -> bool {
        self.info.name.ends_with("[]")
    }

    pub fn array_element(&self) -> Option<&TypeSignature> {
        if self.is_array() {
            self.args.first()
        } else {
            None
        }
    }

    pub fn name(&self) -> &str {
        &self.info.name
    }

    /// Signature of this use site.
    pub fn signature(&self) -> TypeSignature {
        if self.is_array() {
            return TypeSignature::parse(&self.info.name);
        }
        TypeSignature::simple(self.info.name.clone()).with_args(self.args.clone())
    }

    /// Replace this type's parameters in `sig` with the use-site arguments.
    /// Parameters without an argument are left as they are.
    pub fn substitute(&self, sig: &TypeSignature) -> TypeSignature {
        if let Some(index) = self.info.type_params.iter().position(|p| *p == sig.name)
            && let Some(arg) = self.args.get(index)
        {
            let mut replaced = arg.clone();
            replaced.array_dims = replaced.array_dims.saturating_add(sig.array_dims);
            return replaced;
        }
        TypeSignature {
            name: sig.name.clone(),
            args: sig.args.iter().map(|a| self.substitute(a)).collect(),
            array_dims: sig.array_dims,
        }
    }
}

impl fmt::Display for ResolvedType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.signature())
    }
}
