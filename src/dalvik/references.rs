use std::{fmt, str::FromStr};

use crate::error::Error;

/// A call target as it appears in an invoke instruction, e.g. `Landroid/view/View;->setVisibility(I)V`
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct MethodReference {
    pub defining_class: String,
    pub name: String,
    pub parameters: Vec<String>,
    pub return_type: String,
}

impl MethodReference {
    pub fn new(
        defining_class: impl Into<String>,
        name: impl Into<String>,
        parameters: &[&str],
        return_type: impl Into<String>,
    ) -> Self {
        MethodReference {
            defining_class: defining_class.into(),
            name: name.into(),
            parameters: parameters.iter().map(|p| p.to_string()).collect(),
            return_type: return_type.into(),
        }
    }

    /// `(Ljava/lang/String;I)V`
    pub fn prototype(&self) -> String {
        format!("({}){}", self.parameters.concat(), self.return_type)
    }
}

impl fmt::Display for MethodReference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}->{}{}", self.defining_class, self.name, self.prototype())
    }
}

impl FromStr for MethodReference {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (defining_class, rest) = s
            .split_once("->")
            .ok_or_else(|| Error::Descriptor(s.to_string()))?;
        let (name, prototype) = rest
            .split_once('(')
            .ok_or_else(|| Error::Descriptor(s.to_string()))?;
        let (parameters, return_type) = prototype
            .split_once(')')
            .ok_or_else(|| Error::Descriptor(s.to_string()))?;

        if !is_type_descriptor(defining_class) || name.is_empty() {
            return Err(Error::Descriptor(s.to_string()));
        }

        let return_types = parse_type_list(return_type)?;
        if return_types.len() != 1 {
            return Err(Error::Descriptor(s.to_string()));
        }

        Ok(MethodReference {
            defining_class: defining_class.to_string(),
            name: name.to_string(),
            parameters: parse_type_list(parameters)?,
            return_type: return_type.to_string(),
        })
    }
}

/// A field access target, e.g. `Lcom/example/Foo;->bar:Z`
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct FieldReference {
    pub defining_class: String,
    pub name: String,
    pub field_type: String,
}

impl FieldReference {
    pub fn new(
        defining_class: impl Into<String>,
        name: impl Into<String>,
        field_type: impl Into<String>,
    ) -> Self {
        FieldReference {
            defining_class: defining_class.into(),
            name: name.into(),
            field_type: field_type.into(),
        }
    }
}

impl fmt::Display for FieldReference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}->{}:{}", self.defining_class, self.name, self.field_type)
    }
}

impl FromStr for FieldReference {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (defining_class, rest) = s
            .split_once("->")
            .ok_or_else(|| Error::Descriptor(s.to_string()))?;
        let (name, field_type) = rest
            .split_once(':')
            .ok_or_else(|| Error::Descriptor(s.to_string()))?;

        if !is_type_descriptor(defining_class) || !is_type_descriptor(field_type) || name.is_empty()
        {
            return Err(Error::Descriptor(s.to_string()));
        }

        Ok(FieldReference::new(defining_class, name, field_type))
    }
}

/// Whether `descriptor` is exactly one type descriptor
pub fn is_type_descriptor(descriptor: &str) -> bool {
    matches!(parse_type_list(descriptor), Ok(types) if types.len() == 1)
}

/// Splits a concatenated descriptor list like `ZILjava/lang/String;[I` into its types
pub fn parse_type_list(descriptors: &str) -> Result<Vec<String>, Error> {
    let bytes = descriptors.as_bytes();
    let mut types = vec![];
    let mut start = 0;
    let mut index = 0;

    while index < bytes.len() {
        match bytes[index] {
            b'[' => {
                index += 1;
                continue;
            }
            b'V' | b'Z' | b'B' | b'S' | b'C' | b'I' | b'J' | b'F' | b'D' => index += 1,
            b'L' => {
                let end = descriptors[index..]
                    .find(';')
                    .ok_or_else(|| Error::Descriptor(descriptors.to_string()))?;
                index += end + 1;
            }
            _ => return Err(Error::Descriptor(descriptors.to_string())),
        }

        types.push(descriptors[start..index].to_string());
        start = index;
    }

    if start != bytes.len() {
        // Trailing array marker without an element type
        return Err(Error::Descriptor(descriptors.to_string()));
    }

    Ok(types)
}

/// Number of registers a value of this type occupies
pub fn register_width(descriptor: &str) -> u16 {
    match descriptor {
        "J" | "D" => 2,
        _ => 1,
    }
}
