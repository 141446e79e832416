//! Component Descriptor [RP66V1 Section 3.2.2.1]
//!
//! One header byte: the top three bits are the Role, the bottom five are
//! role-specific Characteristics. Validation happens once at construction;
//! after that every accessor is a pure bit test. Accessors specific to a role
//! fail fast when called against the wrong role so schema confusion surfaces
//! immediately instead of as a misleading default.

use crate::error::DlisError;
use crate::Result;

/// The structural role encoded in bits 1-3 of the descriptor
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    /// `000` attribute carried as absent
    AbsentAttribute,
    /// `001` ordinary attribute
    Attribute,
    /// `010` invariant attribute
    InvariantAttribute,
    /// `011` object
    Object,
    /// `100` reserved by the standard
    Reserved,
    /// `101` redundant set
    RedundantSet,
    /// `110` replacement set
    ReplacementSet,
    /// `111` set
    Set,
}

impl Role {
    fn from_bits(bits: u8) -> Role {
        match bits {
            ComponentDescriptor::ROLE_ABSATR => Role::AbsentAttribute,
            ComponentDescriptor::ROLE_ATTRIB => Role::Attribute,
            ComponentDescriptor::ROLE_INVATR => Role::InvariantAttribute,
            ComponentDescriptor::ROLE_OBJECT => Role::Object,
            ComponentDescriptor::ROLE_RESERVED => Role::Reserved,
            ComponentDescriptor::ROLE_RDSET => Role::RedundantSet,
            ComponentDescriptor::ROLE_RSET => Role::ReplacementSet,
            _ => Role::Set,
        }
    }

    /// Short mnemonic as the standard prints it
    pub fn mnemonic(&self) -> &'static str {
        match self {
            Role::AbsentAttribute => "ABSATR",
            Role::Attribute => "ATTRIB",
            Role::InvariantAttribute => "INVATR",
            Role::Object => "OBJECT",
            Role::Reserved => "reserved",
            Role::RedundantSet => "RDSET",
            Role::ReplacementSet => "RSET",
            Role::Set => "SET",
        }
    }
}

/// A validated Component Descriptor byte
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ComponentDescriptor {
    byte: u8,
    role: Role,
}

impl ComponentDescriptor {
    /// Mask selecting the Role bits
    pub const ROLE_MASK: u8 = 0xe0;
    /// Absent Attribute role bits
    pub const ROLE_ABSATR: u8 = 0x00;
    /// Attribute role bits
    pub const ROLE_ATTRIB: u8 = 0x20;
    /// Invariant Attribute role bits
    pub const ROLE_INVATR: u8 = 0x40;
    /// Object role bits
    pub const ROLE_OBJECT: u8 = 0x60;
    /// Reserved role bits
    pub const ROLE_RESERVED: u8 = 0x80;
    /// Redundant Set role bits
    pub const ROLE_RDSET: u8 = 0xa0;
    /// Replacement Set role bits
    pub const ROLE_RSET: u8 = 0xc0;
    /// Set role bits
    pub const ROLE_SET: u8 = 0xe0;

    /// Mask selecting the Characteristics bits
    pub const CHARACTERISTICS_MASK: u8 = 0x1f;

    /// Set group: Type Ident present [Figure 3-3]
    pub const SET_T: u8 = 0x10;
    /// Set group: Name Ident present [Figure 3-3]
    pub const SET_N: u8 = 0x08;
    /// Set group: bits that must be zero
    pub const SET_RESERVED: u8 = 0x07;

    /// Object: OBNAME present [Figure 3-4]
    pub const OBJECT_N: u8 = 0x10;
    /// Object: bits that must be zero
    pub const OBJECT_RESERVED: u8 = 0x0f;

    /// Attribute group: Label present [Figure 3-5]
    pub const ATTRIBUTE_L: u8 = 0x10;
    /// Attribute group: Count present
    pub const ATTRIBUTE_C: u8 = 0x08;
    /// Attribute group: Representation Code present
    pub const ATTRIBUTE_R: u8 = 0x04;
    /// Attribute group: Units present
    pub const ATTRIBUTE_U: u8 = 0x02;
    /// Attribute group: Value present
    pub const ATTRIBUTE_V: u8 = 0x01;

    /// Validate one descriptor byte.
    ///
    /// Construction fails when a Set-group descriptor lacks the Type bit, an
    /// Object descriptor lacks the Name bit, or role-inappropriate reserved
    /// bits are set. [RP66V1 Section 3.2.2, note 5 and Figure 3-3/3-4 notes]
    pub fn from_byte(byte: u8) -> Result<Self> {
        let role = Role::from_bits(byte & Self::ROLE_MASK);
        let descriptor = Self { byte, role };
        if descriptor.is_set_group() {
            if byte & Self::SET_RESERVED != 0 {
                return Err(DlisError::BadDescriptor {
                    descriptor: byte,
                    reason: "reserved bits set for a Set-group descriptor",
                });
            }
            if byte & Self::SET_T == 0 {
                return Err(DlisError::BadDescriptor {
                    descriptor: byte,
                    reason: "Set-group descriptor must have the Type characteristic",
                });
            }
        }
        if role == Role::Object {
            if byte & Self::OBJECT_RESERVED != 0 {
                return Err(DlisError::BadDescriptor {
                    descriptor: byte,
                    reason: "reserved bits set for an Object descriptor",
                });
            }
            if byte & Self::OBJECT_N == 0 {
                return Err(DlisError::BadDescriptor {
                    descriptor: byte,
                    reason: "Object descriptor must have the Name characteristic",
                });
            }
        }
        Ok(descriptor)
    }

    /// The raw descriptor byte
    pub fn as_u8(&self) -> u8 {
        self.byte
    }

    /// The Role in bits 1-3
    pub fn role(&self) -> Role {
        self.role
    }

    fn characteristics(&self) -> u8 {
        self.byte & Self::CHARACTERISTICS_MASK
    }

    /// Attribute, Absent Attribute or Invariant Attribute
    pub fn is_attribute_group(&self) -> bool {
        (self.byte & Self::ROLE_MASK) < Self::ROLE_OBJECT
    }

    /// Set, Redundant Set or Replacement Set
    pub fn is_set_group(&self) -> bool {
        (self.byte & Self::ROLE_MASK) > Self::ROLE_RESERVED
    }

    /// Exactly the Object role
    pub fn is_object(&self) -> bool {
        self.role == Role::Object
    }

    /// Exactly the Absent Attribute role
    pub fn is_absent_attribute(&self) -> bool {
        self.role == Role::AbsentAttribute
    }

    /// Exactly the Invariant Attribute role
    pub fn is_invariant_attribute(&self) -> bool {
        self.role == Role::InvariantAttribute
    }

    fn require_set_group(&self, what: &'static str) -> Result<()> {
        if !self.is_set_group() {
            return Err(DlisError::DescriptorRole(what));
        }
        Ok(())
    }

    fn require_attribute_group(&self, what: &'static str) -> Result<()> {
        if !self.is_attribute_group() {
            return Err(DlisError::DescriptorRole(what));
        }
        Ok(())
    }

    /// Set group: is the Type Ident present (always true after validation)
    pub fn has_set_type(&self) -> Result<bool> {
        self.require_set_group("Set Type characteristic read on a non-Set descriptor")?;
        Ok(self.characteristics() & Self::SET_T != 0)
    }

    /// Set group: is the Name Ident present
    pub fn has_set_name(&self) -> Result<bool> {
        self.require_set_group("Set Name characteristic read on a non-Set descriptor")?;
        Ok(self.characteristics() & Self::SET_N != 0)
    }

    /// Object: is the OBNAME present (always true after validation)
    pub fn has_object_name(&self) -> Result<bool> {
        if !self.is_object() {
            return Err(DlisError::DescriptorRole(
                "Object Name characteristic read on a non-Object descriptor",
            ));
        }
        Ok(self.characteristics() & Self::OBJECT_N != 0)
    }

    /// Attribute group: is the Label present
    pub fn has_label(&self) -> Result<bool> {
        self.require_attribute_group("Label characteristic read on a non-Attribute descriptor")?;
        Ok(self.characteristics() & Self::ATTRIBUTE_L != 0)
    }

    /// Attribute group: is the Count present
    pub fn has_count(&self) -> Result<bool> {
        self.require_attribute_group("Count characteristic read on a non-Attribute descriptor")?;
        Ok(self.characteristics() & Self::ATTRIBUTE_C != 0)
    }

    /// Attribute group: is the Representation Code present
    pub fn has_rep_code(&self) -> Result<bool> {
        self.require_attribute_group(
            "Representation Code characteristic read on a non-Attribute descriptor",
        )?;
        Ok(self.characteristics() & Self::ATTRIBUTE_R != 0)
    }

    /// Attribute group: are the Units present
    pub fn has_units(&self) -> Result<bool> {
        self.require_attribute_group("Units characteristic read on a non-Attribute descriptor")?;
        Ok(self.characteristics() & Self::ATTRIBUTE_U != 0)
    }

    /// Attribute group: is the Value present
    pub fn has_value(&self) -> Result<bool> {
        self.require_attribute_group("Value characteristic read on a non-Attribute descriptor")?;
        Ok(self.characteristics() & Self::ATTRIBUTE_V != 0)
    }
}

impl std::fmt::Display for ComponentDescriptor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} {:03b} {:05b}",
            self.role.mnemonic(),
            (self.byte & Self::ROLE_MASK) >> 5,
            self.characteristics()
        )
    }
}
