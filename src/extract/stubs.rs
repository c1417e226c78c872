//! Stand-in built-ins for schema recovery.
//!
//! The table below is the whole global environment a `.bzl` file is
//! evaluated against. Nothing in it registers rules, touches the filesystem
//! or keeps state between calls: each entry only describes what a call or a
//! reference evaluates to, and the interpreter in `extract::rules` does the
//! rest. The table is immutable, so any number of files can be evaluated
//! against it at once.

use crate::model::AttrType;

/// Callable built-ins.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Builtin {
    /// The `attr` namespace; only its members are callable.
    AttrModule,
    /// `attr.<member>(...)`, producing a descriptor of the given type.
    AttrConstructor(&'static AttrType),
    /// `rule(...)`, the only constructor whose result is rule-like.
    Rule,
    Aspect,
    Provider,
    Label,
    FileType,
    Select,
    Struct,
    Dict,
    List,
    Tuple,
    Len,
    Fail,
    /// Any other universe function; its result is never inspected.
    Opaque(&'static str),
}

/// What a global name evaluates to.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Stub {
    Function(Builtin),
    Bool(bool),
    None,
    Str(&'static str),
    /// An inert value usable syntactically but never inspected.
    Opaque,
}

/// The catalog of globals plus the members of the `attr` namespace.
pub struct StubEnvironment {
    globals: &'static [(&'static str, Stub)],
    attr_members: &'static [(&'static str, AttrType)],
}

impl StubEnvironment {
    pub fn global(&self, name: &str) -> Option<Stub> {
        self.globals
            .iter()
            .find(|(n, _)| *n == name)
            .map(|(_, stub)| *stub)
    }

    pub fn attr_member(&self, name: &str) -> Option<&'static AttrType> {
        self.attr_members
            .iter()
            .find(|(n, _)| *n == name)
            .map(|(_, ty)| ty)
    }

    pub fn attr_member_names(&self) -> impl Iterator<Item = &'static str> {
        self.attr_members.iter().map(|(n, _)| *n)
    }
}

static ATTR_MEMBERS: [(&str, AttrType); 13] = [
    ("bool", AttrType::Boolean),
    ("int", AttrType::Integer),
    ("int_list", AttrType::IntegerList),
    ("label", AttrType::Label),
    ("label_keyed_string_dict", AttrType::LabelKeyedStringDict),
    ("label_list", AttrType::LabelList),
    ("license", AttrType::License),
    ("output", AttrType::Output),
    ("output_list", AttrType::OutputList),
    ("string", AttrType::String),
    ("string_dict", AttrType::StringDict),
    ("string_list", AttrType::StringList),
    ("string_list_dict", AttrType::StringListDict),
];

static GLOBALS: [(&str, Stub); 42] = [
    // Build-language stubs
    ("attr", Stub::Function(Builtin::AttrModule)),
    ("rule", Stub::Function(Builtin::Rule)),
    ("aspect", Stub::Function(Builtin::Aspect)),
    ("provider", Stub::Function(Builtin::Provider)),
    ("FileType", Stub::Function(Builtin::FileType)),
    ("Label", Stub::Function(Builtin::Label)),
    ("select", Stub::Function(Builtin::Select)),
    ("struct", Stub::Function(Builtin::Struct)),
    ("DATA_CFG", Stub::Opaque),
    ("HOST_CFG", Stub::Opaque),
    ("PACKAGE_NAME", Stub::Str("")),
    ("REPOSITORY_NAME", Stub::Str("")),
    ("native", Stub::Opaque),
    // Universe
    ("True", Stub::Bool(true)),
    ("False", Stub::Bool(false)),
    ("None", Stub::None),
    ("dict", Stub::Function(Builtin::Dict)),
    ("list", Stub::Function(Builtin::List)),
    ("tuple", Stub::Function(Builtin::Tuple)),
    ("len", Stub::Function(Builtin::Len)),
    ("fail", Stub::Function(Builtin::Fail)),
    ("all", Stub::Function(Builtin::Opaque("all"))),
    ("any", Stub::Function(Builtin::Opaque("any"))),
    ("bool", Stub::Function(Builtin::Opaque("bool"))),
    ("depset", Stub::Function(Builtin::Opaque("depset"))),
    ("dir", Stub::Function(Builtin::Opaque("dir"))),
    ("enumerate", Stub::Function(Builtin::Opaque("enumerate"))),
    ("getattr", Stub::Function(Builtin::Opaque("getattr"))),
    ("hasattr", Stub::Function(Builtin::Opaque("hasattr"))),
    ("hash", Stub::Function(Builtin::Opaque("hash"))),
    ("int", Stub::Function(Builtin::Opaque("int"))),
    ("max", Stub::Function(Builtin::Opaque("max"))),
    ("min", Stub::Function(Builtin::Opaque("min"))),
    ("print", Stub::Function(Builtin::Opaque("print"))),
    ("range", Stub::Function(Builtin::Opaque("range"))),
    ("repr", Stub::Function(Builtin::Opaque("repr"))),
    ("reversed", Stub::Function(Builtin::Opaque("reversed"))),
    ("set", Stub::Function(Builtin::Opaque("set"))),
    ("sorted", Stub::Function(Builtin::Opaque("sorted"))),
    ("str", Stub::Function(Builtin::Opaque("str"))),
    ("type", Stub::Function(Builtin::Opaque("type"))),
    ("zip", Stub::Function(Builtin::Opaque("zip"))),
];

/// The process-wide stub catalog.
pub static STUB_ENVIRONMENT: StubEnvironment = StubEnvironment {
    globals: &GLOBALS,
    attr_members: &ATTR_MEMBERS,
};
