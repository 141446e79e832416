//! Explicitly Formatted Logical Records. [RP66V1 Section 3]
//!
//! An EFLR is a flat component stream: one Set component, then Template
//! Attributes until the first Object component, then Objects each followed by
//! their Attribute components. The Template supplies per-attribute defaults;
//! an Object's attribute inherits every characteristic it does not restate.

use crate::descriptor::ComponentDescriptor;
use crate::error::DlisError;
use crate::logical_data::LogicalData;
use crate::repcode::{self, ObjectName, Value, RC_IDENT};
use crate::Result;
use bytes::Bytes;
use std::collections::HashMap;

/// The Set component heading an EFLR. [RP66V1 Section 3.2.2.1]
#[derive(Debug, Clone, PartialEq)]
pub struct SetHeader {
    /// The Set's Component Descriptor
    pub descriptor: ComponentDescriptor,
    /// Set Type, always present
    pub set_type: Bytes,
    /// Optional Set Name
    pub name: Option<Bytes>,
}

impl SetHeader {
    /// Parse the Set component, descriptor byte included
    pub fn parse(ld: &mut LogicalData) -> Result<Self> {
        let descriptor = ComponentDescriptor::from_byte(ld.read_byte()?)?;
        if !descriptor.is_set_group() {
            return Err(DlisError::Schema(format!(
                "expected a Set component, got role {}",
                descriptor.role().mnemonic()
            )));
        }
        // Set Type presence is enforced at descriptor construction.
        let set_type = repcode::ident(ld)?;
        let name = if descriptor.has_set_name()? {
            Some(repcode::ident(ld)?)
        } else {
            None
        };
        Ok(Self {
            descriptor,
            set_type,
            name,
        })
    }
}

/// One Attribute component, either in the Template or in an Object.
/// [RP66V1 Section 3.2.2.1]
#[derive(Debug, Clone, PartialEq)]
pub struct Attribute {
    /// The Attribute's Component Descriptor
    pub descriptor: ComponentDescriptor,
    /// Attribute Label. Defaulted from the Template for Object attributes.
    pub label: Bytes,
    /// Number of Elements in the Value
    pub count: u32,
    /// Representation Code of the Value
    pub rep_code: u8,
    /// Units of the Value, empty when unset
    pub units: Bytes,
    /// The decoded Value, `count` elements when present
    pub values: Vec<Value>,
}

impl Attribute {
    /// Parse a Template Attribute. The descriptor byte has already been
    /// consumed. A Template Attribute must carry a Label.
    pub fn parse_template(descriptor: ComponentDescriptor, ld: &mut LogicalData) -> Result<Self> {
        if !descriptor.has_label()? {
            return Err(DlisError::Schema(
                "Template Attribute without a Label".to_string(),
            ));
        }
        let label = repcode::ident(ld)?;
        let count = if descriptor.has_count()? {
            repcode::uvari(ld)?
        } else {
            1
        };
        let rep_code = if descriptor.has_rep_code()? {
            repcode::ushort(ld)?
        } else {
            RC_IDENT
        };
        let units = if descriptor.has_units()? {
            repcode::units(ld)?
        } else {
            Bytes::new()
        };
        let values = if descriptor.has_value()? {
            Self::read_values(count, rep_code, ld)?
        } else {
            Vec::new()
        };
        Ok(Self {
            descriptor,
            label,
            count,
            rep_code,
            units,
            values,
        })
    }

    /// Parse an Object Attribute, merging against its Template default.
    /// Every characteristic the stream omits is inherited from `default`.
    pub fn parse_with_default(
        descriptor: ComponentDescriptor,
        ld: &mut LogicalData,
        default: &Attribute,
    ) -> Result<Self> {
        let label = if descriptor.has_label()? {
            repcode::ident(ld)?
        } else {
            default.label.clone()
        };
        let count = if descriptor.has_count()? {
            repcode::uvari(ld)?
        } else {
            default.count
        };
        let rep_code = if descriptor.has_rep_code()? {
            repcode::ushort(ld)?
        } else {
            default.rep_code
        };
        let units = if descriptor.has_units()? {
            repcode::units(ld)?
        } else {
            default.units.clone()
        };
        let values = if descriptor.has_value()? {
            Self::read_values(count, rep_code, ld)?
        } else {
            default.values.clone()
        };
        Ok(Self {
            descriptor,
            label,
            count,
            rep_code,
            units,
            values,
        })
    }

    fn read_values(count: u32, rep_code: u8, ld: &mut LogicalData) -> Result<Vec<Value>> {
        let mut values = Vec::with_capacity(count as usize);
        for _ in 0..count {
            values.push(repcode::decode(rep_code, ld)?);
        }
        Ok(values)
    }

    /// The single value, when the Attribute holds exactly one element
    pub fn scalar(&self) -> Option<&Value> {
        match self.values.as_slice() {
            [value] => Some(value),
            _ => None,
        }
    }
}

/// The Template: the ordered Attribute defaults every Object in the Set
/// follows. Labels are unique within a Template.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Template {
    attrs: Vec<Attribute>,
    label_map: HashMap<Bytes, usize>,
}

impl Template {
    fn push(&mut self, attr: Attribute) -> Result<()> {
        if self.label_map.contains_key(&attr.label) {
            return Err(DlisError::Schema(format!(
                "duplicate Template label {:?}",
                String::from_utf8_lossy(&attr.label)
            )));
        }
        self.label_map.insert(attr.label.clone(), self.attrs.len());
        self.attrs.push(attr);
        Ok(())
    }

    /// Number of Attributes in the Template
    pub fn len(&self) -> usize {
        self.attrs.len()
    }

    /// True when the Template has no Attributes
    pub fn is_empty(&self) -> bool {
        self.attrs.is_empty()
    }

    /// The Template Attributes in stream order
    pub fn attributes(&self) -> &[Attribute] {
        &self.attrs
    }

    /// Index of the Attribute with the given Label
    pub fn index_of(&self, label: &[u8]) -> Option<usize> {
        self.label_map.get(label).copied()
    }
}

/// One Object and its Attributes, position-aligned with the Template.
/// `None` marks an Absent Attribute.
#[derive(Debug, Clone, PartialEq)]
pub struct Object {
    /// The Object's name, unique within its Set
    pub name: ObjectName,
    attrs: Vec<Option<Attribute>>,
}

impl Object {
    /// The Object's Attributes in Template order
    pub fn attributes(&self) -> &[Option<Attribute>] {
        &self.attrs
    }

    /// The Attribute at a Template index, `None` when absent
    pub fn attribute(&self, index: usize) -> Option<&Attribute> {
        self.attrs.get(index).and_then(Option::as_ref)
    }
}

/// A fully parsed EFLR: Set header, Template and Objects
#[derive(Debug, Clone, PartialEq)]
pub struct ExplicitlyFormattedLogicalRecord {
    /// The Logical Record type the record was framed with
    pub lr_type: u8,
    /// The Set component
    pub set: SetHeader,
    /// The Template
    pub template: Template,
    objects: Vec<Object>,
    object_map: HashMap<ObjectName, usize>,
}

impl ExplicitlyFormattedLogicalRecord {
    /// Parse a complete EFLR from its Logical Data.
    ///
    /// Duplicate Template labels and duplicate Object names are rejected;
    /// producers that emit them are writing records a consumer cannot
    /// address unambiguously.
    pub fn parse(lr_type: u8, ld: &mut LogicalData) -> Result<Self> {
        let set = SetHeader::parse(ld)?;
        let mut template = Template::default();
        while ld.remaining() != 0 {
            // Lookahead: an Object descriptor terminates the Template and
            // must not be consumed here.
            let descriptor = ComponentDescriptor::from_byte(ld.peek_byte()?)?;
            if descriptor.is_object() {
                break;
            }
            if descriptor.is_absent_attribute() {
                return Err(DlisError::Schema(
                    "Absent Attribute in Template".to_string(),
                ));
            }
            if !descriptor.is_attribute_group() {
                return Err(DlisError::Schema(format!(
                    "expected a Template Attribute or Object, got role {}",
                    descriptor.role().mnemonic()
                )));
            }
            ld.skip(1)?;
            template.push(Attribute::parse_template(descriptor, ld)?)?;
        }

        let mut record = Self {
            lr_type,
            set,
            template,
            objects: Vec::new(),
            object_map: HashMap::new(),
        };
        while ld.remaining() != 0 {
            record.parse_object(ld)?;
        }
        Ok(record)
    }

    /// Parse one Object component and its Attribute run, stopping at the
    /// next Object descriptor or the end of the record
    fn parse_object(&mut self, ld: &mut LogicalData) -> Result<()> {
        let descriptor = ComponentDescriptor::from_byte(ld.read_byte()?)?;
        if !descriptor.is_object() {
            return Err(DlisError::Schema(format!(
                "expected an Object component, got role {}",
                descriptor.role().mnemonic()
            )));
        }
        // Object Name presence is enforced at descriptor construction.
        let name = repcode::obname(ld)?;
        let mut attrs: Vec<Option<Attribute>> = Vec::with_capacity(self.template.len());
        while ld.remaining() != 0 {
            let descriptor = ComponentDescriptor::from_byte(ld.peek_byte()?)?;
            if descriptor.is_object() {
                break;
            }
            if !descriptor.is_attribute_group() {
                return Err(DlisError::Schema(format!(
                    "expected an Object Attribute, got role {}",
                    descriptor.role().mnemonic()
                )));
            }
            let index = attrs.len();
            let default = self.template.attrs.get(index).ok_or_else(|| {
                DlisError::Schema(format!(
                    "Object {name} has more Attributes than the {} in the Template",
                    self.template.len()
                ))
            })?;
            ld.skip(1)?;
            if descriptor.is_absent_attribute() {
                attrs.push(None);
            } else if descriptor.is_invariant_attribute() {
                attrs.push(Some(default.clone()));
            } else {
                attrs.push(Some(Attribute::parse_with_default(descriptor, ld, default)?));
            }
        }
        // Unstated trailing attributes take their Template defaults.
        while attrs.len() < self.template.len() {
            attrs.push(Some(self.template.attrs[attrs.len()].clone()));
        }
        if self.object_map.contains_key(&name) {
            return Err(DlisError::Schema(format!("duplicate Object name {name}")));
        }
        self.object_map.insert(name.clone(), self.objects.len());
        self.objects.push(Object { name, attrs });
        Ok(())
    }

    /// The Objects in stream order
    pub fn objects(&self) -> &[Object] {
        &self.objects
    }

    /// Number of Objects
    pub fn len(&self) -> usize {
        self.objects.len()
    }

    /// True when the record has no Objects
    pub fn is_empty(&self) -> bool {
        self.objects.is_empty()
    }

    /// Look up an Object by name
    pub fn object(&self, name: &ObjectName) -> Option<&Object> {
        self.object_map.get(name).map(|&i| &self.objects[i])
    }

    /// Look up one Object Attribute by Object name and Template Label
    pub fn attribute(&self, name: &ObjectName, label: &[u8]) -> Option<&Attribute> {
        let index = self.template.index_of(label)?;
        self.object(name)?.attribute(index)
    }
}
