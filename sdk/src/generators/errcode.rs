//! `@Code`: error code registry for var/const declarations
//!
//! ```go
//! const (
//!     // @Code(http=404, grpc=NotFound, msg="user not found")
//!     ErrUserNotFound = 20001
//! )
//! ```
//!
//! Codes are unique per package. Values compare by number only, so
//! `int32(20001)` collides with `20001`, while a literal that does not fit its
//! declared type is rejected.

use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::fmt;
use std::hash::{Hash, Hasher};
use std::path::PathBuf;

use convert_case::{Case, Casing};
use tracing::debug;

use super::{add_output, go_quote, GoFile};
use crate::annotation::{ParamKind, ParamSpec};
use crate::core::{AnnotatedTarget, GenContext, GenerateOutput, Generator};
use crate::error::GenError;
use crate::scanner::TargetKind;

/// Statuses defined by Go's net/http package
const HTTP_STATUSES: &[u16] = &[
    100, 101, 102, 103, 200, 201, 202, 203, 204, 205, 206, 207, 208, 226, 300, 301, 302, 303, 304, 305, 307, 308,
    400, 401, 402, 403, 404, 405, 406, 407, 408, 409, 410, 411, 412, 413, 414, 415, 416, 417, 418, 421, 422, 423,
    424, 425, 426, 428, 429, 431, 451, 500, 501, 502, 503, 504, 505, 506, 507, 508, 510, 511,
];

/// Canonical gRPC status code names
const GRPC_CODES: &[&str] = &[
    "OK",
    "Canceled",
    "Unknown",
    "InvalidArgument",
    "DeadlineExceeded",
    "NotFound",
    "AlreadyExists",
    "PermissionDenied",
    "ResourceExhausted",
    "FailedPrecondition",
    "Aborted",
    "OutOfRange",
    "Unimplemented",
    "Internal",
    "Unavailable",
    "DataLoss",
    "Unauthenticated",
];

fn validate_code(raw: &str) -> Result<(), String> {
    TypedInt::parse(raw, None).map(|_| ())
}

fn validate_http(raw: &str) -> Result<(), String> {
    match raw.parse::<u16>() {
        Ok(status) if HTTP_STATUSES.contains(&status) => Ok(()),
        _ => Err("not a standard HTTP status".to_string()),
    }
}

fn validate_grpc(raw: &str) -> Result<(), String> {
    if GRPC_CODES.contains(&raw) {
        Ok(())
    } else {
        Err(format!("expected one of {}", GRPC_CODES.join(", ")))
    }
}

const PARAMS: &[ParamSpec] = &[
    ParamSpec::optional("code", ParamKind::String, "error code; defaults to the declared integer value")
        .with_validator(validate_code),
    ParamSpec::optional("http", ParamKind::Int, "HTTP status reported for the error")
        .with_default("500")
        .with_validator(validate_http),
    ParamSpec::optional("grpc", ParamKind::String, "gRPC status code name")
        .with_default("Unknown")
        .with_validator(validate_grpc),
    ParamSpec::optional("msg", ParamKind::String, "human readable message"),
];

/// Go integer kinds with their value ranges
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IntKind {
    Int,
    Int8,
    Int16,
    Int32,
    Int64,
    Uint,
    Uint8,
    Uint16,
    Uint32,
    Uint64,
    Uintptr,
}

impl IntKind {
    /// Kind of a builtin type name; `byte` and `rune` are aliases
    pub fn from_type(name: &str) -> Option<Self> {
        Some(match name {
            "int" => IntKind::Int,
            "int8" => IntKind::Int8,
            "int16" => IntKind::Int16,
            "int32" | "rune" => IntKind::Int32,
            "int64" => IntKind::Int64,
            "uint" => IntKind::Uint,
            "uint8" | "byte" => IntKind::Uint8,
            "uint16" => IntKind::Uint16,
            "uint32" => IntKind::Uint32,
            "uint64" => IntKind::Uint64,
            "uintptr" => IntKind::Uintptr,
            _ => return None,
        })
    }

    pub fn range(self) -> (i128, i128) {
        match self {
            IntKind::Int8 => (i8::MIN.into(), i8::MAX.into()),
            IntKind::Int16 => (i16::MIN.into(), i16::MAX.into()),
            IntKind::Int32 => (i32::MIN.into(), i32::MAX.into()),
            IntKind::Int | IntKind::Int64 => (i64::MIN.into(), i64::MAX.into()),
            IntKind::Uint8 => (0, u8::MAX.into()),
            IntKind::Uint16 => (0, u16::MAX.into()),
            IntKind::Uint32 => (0, u32::MAX.into()),
            IntKind::Uint | IntKind::Uint64 | IntKind::Uintptr => (0, u64::MAX.into()),
        }
    }

    pub fn type_name(self) -> &'static str {
        match self {
            IntKind::Int => "int",
            IntKind::Int8 => "int8",
            IntKind::Int16 => "int16",
            IntKind::Int32 => "int32",
            IntKind::Int64 => "int64",
            IntKind::Uint => "uint",
            IntKind::Uint8 => "uint8",
            IntKind::Uint16 => "uint16",
            IntKind::Uint32 => "uint32",
            IntKind::Uint64 => "uint64",
            IntKind::Uintptr => "uintptr",
        }
    }
}

/// An integer code with the kind it was declared as.
///
/// Equality and hashing look at the numeric value only.
#[derive(Debug, Clone, Copy)]
pub struct TypedInt {
    pub value: i128,
    pub kind: IntKind,
}

impl PartialEq for TypedInt {
    fn eq(&self, other: &Self) -> bool {
        self.same_value(other)
    }
}

impl Eq for TypedInt {}

impl Hash for TypedInt {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.value.hash(state);
    }
}

impl fmt::Display for TypedInt {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.value)
    }
}

impl TypedInt {
    pub fn new(value: i128, kind: IntKind) -> Result<Self, String> {
        let (min, max) = kind.range();
        if value < min || value > max {
            return Err(format!("{} overflows {}", value, kind.type_name()));
        }
        Ok(Self { value, kind })
    }

    /// Parse a literal (`20001`, `0x4e21`, `1_000`) or a conversion
    /// (`int32(20001)`); `declared` is the declared type, if any
    pub fn parse(expr: &str, declared: Option<&str>) -> Result<Self, String> {
        let expr = expr.trim();
        let (kind, literal) = match expr.split_once('(') {
            Some((ty, rest)) if rest.ends_with(')') => {
                let kind = IntKind::from_type(ty.trim())
                    .ok_or_else(|| format!("'{}' is not an integer type", ty.trim()))?;
                (kind, rest[..rest.len() - 1].trim())
            }
            _ => (
                declared.and_then(IntKind::from_type).unwrap_or(IntKind::Int),
                expr,
            ),
        };
        Self::new(parse_int_literal(literal)?, kind)
    }

    pub fn same_value(&self, other: &TypedInt) -> bool {
        self.value == other.value
    }
}

/// Parse a Go integer literal with an optional sign
pub fn parse_int_literal(literal: &str) -> Result<i128, String> {
    let cleaned: String = literal.trim().chars().filter(|c| *c != '_').collect();
    let (negative, digits) = match cleaned.strip_prefix('-') {
        Some(rest) => (true, rest),
        None => (false, cleaned.strip_prefix('+').unwrap_or(&cleaned)),
    };
    let lower = digits.to_ascii_lowercase();
    let (radix, body) = if let Some(hex) = lower.strip_prefix("0x") {
        (16, hex.to_string())
    } else if let Some(bin) = lower.strip_prefix("0b") {
        (2, bin.to_string())
    } else if let Some(oct) = lower.strip_prefix("0o") {
        (8, oct.to_string())
    } else if lower.len() > 1 && lower.starts_with('0') {
        (8, lower[1..].to_string())
    } else {
        (10, lower.clone())
    };
    if body.is_empty() {
        return Err(format!("'{literal}' is not an integer literal"));
    }
    let magnitude =
        i128::from_str_radix(&body, radix).map_err(|_| format!("'{literal}' is not an integer literal"))?;
    Ok(if negative { -magnitude } else { magnitude })
}

/// One code ready to render
struct Entry {
    name: String,
    code: TypedInt,
    http: i64,
    grpc: String,
    message: String,
    type_text: Option<String>,
}

/// Generator for `@Code`
pub struct ErrCodeGenerator;

impl ErrCodeGenerator {
    fn entry(&self, target: &AnnotatedTarget) -> Result<Entry, GenError> {
        let declared = target.target.type_text.as_deref();
        let code = match (target.params.str("code"), target.target.value.as_deref()) {
            (Some(raw), _) => TypedInt::parse(raw, declared),
            (None, Some(value)) => TypedInt::parse(value, declared),
            (None, None) => Err("no integer value; add code=".to_string()),
        }
        .map_err(|e| GenError::invalid(format!("invalid code for {}: {}", target.target.name, e)))?;

        if code.value < i64::MIN.into() || code.value > i64::MAX.into() {
            return Err(GenError::invalid(format!("code {} does not fit int64", code)));
        }

        Ok(Entry {
            name: target.target.name.clone(),
            code,
            http: target.params.int("http").unwrap_or(500),
            grpc: target.params.str("grpc").unwrap_or("Unknown").to_string(),
            message: target.params.str("msg").unwrap_or_default().to_string(),
            type_text: target.target.type_text.clone(),
        })
    }
}

impl Generator for ErrCodeGenerator {
    fn name(&self) -> &str {
        "errcode"
    }

    fn annotations(&self) -> &[&'static str] {
        &["Code"]
    }

    fn target_kinds(&self) -> &[TargetKind] {
        &[TargetKind::Var, TargetKind::Const]
    }

    fn priority(&self) -> i32 {
        10
    }

    fn params(&self) -> &[ParamSpec] {
        PARAMS
    }

    fn default_output(&self) -> &str {
        "$FILE_errcode_gen.go"
    }

    fn generate(&self, _ctx: &GenContext<'_>, targets: &[AnnotatedTarget]) -> GenerateOutput {
        let mut out = GenerateOutput::default();
        let mut seen: HashMap<(PathBuf, String), Vec<(TypedInt, String)>> = HashMap::new();
        let mut groups: BTreeMap<(PathBuf, PathBuf), (Vec<Entry>, &AnnotatedTarget)> = BTreeMap::new();

        for target in targets {
            let entry = match self.entry(target) {
                Ok(entry) => entry,
                Err(e) => {
                    out.errors.push(target.error(self.name(), e));
                    continue;
                }
            };

            let package = (target.target.dir(), target.target.package_name.clone());
            let used = seen.entry(package).or_default();
            if let Some((_, owner)) = used.iter().find(|(code, _)| code.same_value(&entry.code)) {
                let message = format!("duplicate code {} (already used by {})", entry.code, owner);
                out.errors.push(target.error(self.name(), GenError::invalid(message)));
                continue;
            }
            used.push((entry.code, entry.name.clone()));

            let key = (target.output.clone(), target.target.file_path.clone());
            groups.entry(key).or_insert_with(|| (Vec::new(), target)).0.push(entry);
        }

        for ((_, source_file), (entries, first)) in groups {
            let mut file = GoFile::new(first.target.package_name.clone());
            for entry in &entries {
                file.push(render_entry(entry));
            }
            let stem = source_file
                .file_stem()
                .map(|s| s.to_string_lossy().to_case(Case::Pascal))
                .unwrap_or_default();
            file.push(render_lookup(&stem, &entries));
            debug!("errcode: {} codes for {}", entries.len(), source_file.display());
            add_output(&mut out, self.name(), first, file);
        }

        out
    }
}

fn render_entry(entry: &Entry) -> String {
    let rows = vec![
        (format!("{}HTTPStatus", entry.name), format!("= {}", entry.http)),
        (format!("{}GRPCCode", entry.name), format!("= {}", go_quote(&entry.grpc))),
        (format!("{}Message", entry.name), format!("= {}", go_quote(&entry.message))),
    ];
    format!(
        "// {} error metadata (code {}).\nconst (\n{}\n)",
        entry.name,
        entry.code,
        super::align(&rows, "\t")
    )
}

fn render_lookup(stem: &str, entries: &[Entry]) -> String {
    let mut kinds: Vec<String> = [
        "int", "int8", "int16", "int32", "int64", "uint", "uint8", "uint16", "uint32", "uintptr",
    ]
    .iter()
    .map(|k| k.to_string())
    .collect();
    let named: BTreeSet<&str> = entries
        .iter()
        .filter_map(|e| e.type_text.as_deref())
        .filter(|t| IntKind::from_type(t).is_none() && crate::decl::is_identifier(t))
        .collect();
    kinds.extend(named.into_iter().map(str::to_string));

    let mut body = String::new();
    body.push_str(&format!(
        "// Lookup{stem}Code returns the metadata registered for code, accepting any integer type.\n"
    ));
    body.push_str(&format!(
        "func Lookup{stem}Code(code any) (httpStatus int, grpcCode string, message string, ok bool) {{\n"
    ));
    body.push_str("\tvar n int64\n\tswitch v := code.(type) {\n");
    for kind in &kinds {
        body.push_str(&format!("\tcase {kind}:\n\t\tn = int64(v)\n"));
    }
    body.push_str("\tcase uint64:\n\t\tif v > 1<<63-1 {\n\t\t\treturn 0, \"\", \"\", false\n\t\t}\n\t\tn = int64(v)\n");
    body.push_str("\tdefault:\n\t\treturn 0, \"\", \"\", false\n\t}\n\tswitch n {\n");
    for entry in entries {
        body.push_str(&format!(
            "\tcase {}:\n\t\treturn {name}HTTPStatus, {name}GRPCCode, {name}Message, true\n",
            entry.code,
            name = entry.name
        ));
    }
    body.push_str("\t}\n\treturn 0, \"\", \"\", false\n}");
    body
}
