//! Format-agnostic data model for extracted rule documentation.
//!
//! Serialized field names follow the build-language record layout
//! (`rule`, `attribute`, `documentation`, ...) so the JSON rendering of a
//! [`Document`] can be read back with [`Document::from_json`].

use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// Every rule and macro extracted from one source file.
#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Document {
    #[serde(rename = "rule", default)]
    pub rules: Vec<RuleEntry>,
}

impl Document {
    /// Read a document previously written by the JSON renderer.
    pub fn from_json(text: &str) -> serde_json::Result<Self> {
        serde_json::from_str(text)
    }

    pub fn rule(&self, name: &str) -> Option<&RuleEntry> {
        self.rules.iter().find(|r| r.name == name)
    }
}

/// A single documented rule or macro.
#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RuleEntry {
    pub name: String,
    /// Docstring text preceding the attribute listing.
    #[serde(rename = "documentation", default)]
    pub summary: String,
    /// `name` first, then ascending by attribute name.
    #[serde(rename = "attribute", default)]
    pub attributes: Vec<AttributeEntry>,
}

impl RuleEntry {
    pub fn attribute(&self, name: &str) -> Option<&AttributeEntry> {
        self.attributes.iter().find(|a| a.name == name)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttributeEntry {
    pub name: String,
    #[serde(rename = "type")]
    pub attr_type: AttrType,
    #[serde(default)]
    pub mandatory: bool,
    #[serde(rename = "documentation", default)]
    pub doc: String,
}

/// Attribute type vocabulary of the build language.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum AttrType {
    Integer,
    String,
    Label,
    Output,
    StringList,
    LabelList,
    OutputList,
    DistributionSet,
    License,
    StringDict,
    FilesetEntryList,
    LabelListDict,
    StringListDict,
    Boolean,
    Tristate,
    IntegerList,
    StringDictUnary,
    Unknown,
    LabelDictUnary,
    SelectorList,
    LabelKeyedStringDict,
    Name,
    /// A type name read from outside the known vocabulary.
    Unrecognized(String),
}

impl AttrType {
    /// The canonical upper-case name, e.g. `STRING_LIST`.
    pub fn as_str(&self) -> &str {
        match self {
            AttrType::Integer => "INTEGER",
            AttrType::String => "STRING",
            AttrType::Label => "LABEL",
            AttrType::Output => "OUTPUT",
            AttrType::StringList => "STRING_LIST",
            AttrType::LabelList => "LABEL_LIST",
            AttrType::OutputList => "OUTPUT_LIST",
            AttrType::DistributionSet => "DISTRIBUTION_SET",
            AttrType::License => "LICENSE",
            AttrType::StringDict => "STRING_DICT",
            AttrType::FilesetEntryList => "FILESET_ENTRY_LIST",
            AttrType::LabelListDict => "LABEL_LIST_DICT",
            AttrType::StringListDict => "STRING_LIST_DICT",
            AttrType::Boolean => "BOOLEAN",
            AttrType::Tristate => "TRISTATE",
            AttrType::IntegerList => "INTEGER_LIST",
            AttrType::StringDictUnary => "STRING_DICT_UNARY",
            AttrType::Unknown => "UNKNOWN",
            AttrType::LabelDictUnary => "LABEL_DICT_UNARY",
            AttrType::SelectorList => "SELECTOR_LIST",
            AttrType::LabelKeyedStringDict => "LABEL_KEYED_STRING_DICT",
            AttrType::Name => "NAME",
            AttrType::Unrecognized(name) => name,
        }
    }

    /// Inverse of [`AttrType::as_str`]; names outside the vocabulary are kept
    /// as [`AttrType::Unrecognized`].
    pub fn from_name(name: &str) -> Self {
        match name {
            "INTEGER" => AttrType::Integer,
            "STRING" => AttrType::String,
            "LABEL" => AttrType::Label,
            "OUTPUT" => AttrType::Output,
            "STRING_LIST" => AttrType::StringList,
            "LABEL_LIST" => AttrType::LabelList,
            "OUTPUT_LIST" => AttrType::OutputList,
            "DISTRIBUTION_SET" => AttrType::DistributionSet,
            "LICENSE" => AttrType::License,
            "STRING_DICT" => AttrType::StringDict,
            "FILESET_ENTRY_LIST" => AttrType::FilesetEntryList,
            "LABEL_LIST_DICT" => AttrType::LabelListDict,
            "STRING_LIST_DICT" => AttrType::StringListDict,
            "BOOLEAN" => AttrType::Boolean,
            "TRISTATE" => AttrType::Tristate,
            "INTEGER_LIST" => AttrType::IntegerList,
            "STRING_DICT_UNARY" => AttrType::StringDictUnary,
            "UNKNOWN" => AttrType::Unknown,
            "LABEL_DICT_UNARY" => AttrType::LabelDictUnary,
            "SELECTOR_LIST" => AttrType::SelectorList,
            "LABEL_KEYED_STRING_DICT" => AttrType::LabelKeyedStringDict,
            "NAME" => AttrType::Name,
            other => AttrType::Unrecognized(other.to_string()),
        }
    }
}

impl Serialize for AttrType {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for AttrType {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let name = String::deserialize(deserializer)?;
        Ok(AttrType::from_name(&name))
    }
}
