use std::fmt;
use thiserror::Error;

const ACC_VARARGS: u16 = 0x0080;

const MIN_SUPPORTED_MAJOR: u16 = 45;
/// Java 25.
const MAX_SUPPORTED_MAJOR: u16 = 69;

const STATIC_INITIALIZER: &str = "<clinit>";
const DEPRECATED_ANNOTATION: &str = "Ljava/lang/Deprecated;";

#[derive(Debug, Error)]
pub enum ClassParseError {
    #[error("unexpected end of class file")]
    UnexpectedEof,
    #[error("invalid class file magic header")]
    InvalidMagic,
    #[error("unsupported class file version {major}.{minor}")]
    UnsupportedVersion { major: u16, minor: u16 },
    #[error("unsupported constant pool tag {tag}")]
    UnsupportedConstant { tag: u8 },
    #[error("invalid constant pool index {index}")]
    InvalidConstantIndex { index: u16 },
    #[error("malformed descriptor: {0}")]
    InvalidDescriptor(String),
}

/// Structural view of one compiled class: its own name and the methods it declares.
#[derive(Debug, Clone)]
pub struct ParsedClass {
    pub fqcn: String,
    pub methods: Vec<ParsedMethod>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedMethod {
    pub name: String,
    pub parameters: Vec<FieldType>,
    pub deprecated: bool,
    pub varargs: bool,
}

/// A decoded field descriptor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldType {
    Primitive(&'static str),
    Reference(String),
    Array {
        element: Box<FieldType>,
        dimensions: usize,
    },
}

impl fmt::Display for FieldType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldType::Primitive(name) => f.write_str(name),
            FieldType::Reference(name) => f.write_str(name),
            FieldType::Array {
                element,
                dimensions,
            } => {
                write!(f, "{element}")?;
                for _ in 0..*dimensions {
                    f.write_str("[]")?;
                }
                Ok(())
            }
        }
    }
}

pub fn parse_class(bytes: &[u8]) -> Result<ParsedClass, ClassParseError> {
    let mut reader = ClassReader::new(bytes);
    reader.expect_magic()?;
    let minor = reader.read_u2()?;
    let major = reader.read_u2()?;
    if !(MIN_SUPPORTED_MAJOR..=MAX_SUPPORTED_MAJOR).contains(&major) {
        return Err(ClassParseError::UnsupportedVersion { major, minor });
    }
    let constant_pool = ConstantPool::parse(&mut reader)?;

    let _access_flags = reader.read_u2()?;
    let this_class = reader.read_u2()?;
    let _super_class = reader.read_u2()?;

    let interfaces_count = reader.read_u2()?;
    for _ in 0..interfaces_count {
        reader.read_u2()?;
    }

    let fields_count = reader.read_u2()?;
    for _ in 0..fields_count {
        skip_member(&mut reader)?;
    }

    let mut methods = Vec::new();
    let methods_count = reader.read_u2()?;
    for _ in 0..methods_count {
        let access_flags = reader.read_u2()?;
        let name_index = reader.read_u2()?;
        let descriptor_index = reader.read_u2()?;
        let attributes_count = reader.read_u2()?;

        let name = constant_pool.utf8(name_index)?;
        let descriptor = constant_pool.utf8(descriptor_index)?;
        let deprecated = method_is_deprecated(&mut reader, &constant_pool, attributes_count)?;

        if name == STATIC_INITIALIZER {
            continue;
        }

        methods.push(ParsedMethod {
            name: name.to_string(),
            parameters: parse_method_parameters(descriptor)?,
            deprecated,
            varargs: access_flags & ACC_VARARGS != 0,
        });
    }

    // Class attributes carry nothing the index needs.
    let attributes_count = reader.read_u2()?;
    skip_attributes(&mut reader, attributes_count)?;

    let class_name = constant_pool.class_name(this_class)?;
    Ok(ParsedClass {
        fqcn: class_name.replace('/', "."),
        methods,
    })
}

fn method_is_deprecated(
    reader: &mut ClassReader<'_>,
    constant_pool: &ConstantPool,
    attributes_count: u16,
) -> Result<bool, ClassParseError> {
    let mut deprecated = false;
    for _ in 0..attributes_count {
        let name_index = reader.read_u2()?;
        let length = reader.read_u4()? as usize;
        let body = reader.read_slice(length)?;
        match constant_pool.utf8(name_index)? {
            "Deprecated" => deprecated = true,
            "RuntimeVisibleAnnotations" | "RuntimeInvisibleAnnotations" => {
                let mut sub_reader = ClassReader::new(body);
                for annotation_type in read_annotation_types(&mut sub_reader, constant_pool)? {
                    if annotation_type == DEPRECATED_ANNOTATION {
                        deprecated = true;
                    }
                }
            }
            _ => {}
        }
    }
    Ok(deprecated)
}

fn read_annotation_types<'p>(
    reader: &mut ClassReader<'_>,
    constant_pool: &'p ConstantPool,
) -> Result<Vec<&'p str>, ClassParseError> {
    let count = reader.read_u2()?;
    let mut types = Vec::with_capacity(count as usize);
    for _ in 0..count {
        let type_index = reader.read_u2()?;
        types.push(constant_pool.utf8(type_index)?);
        skip_annotation_body(reader)?;
    }
    Ok(types)
}

fn skip_annotation_body(reader: &mut ClassReader<'_>) -> Result<(), ClassParseError> {
    let pairs = reader.read_u2()?;
    for _ in 0..pairs {
        reader.read_u2()?; // element_name_index
        skip_element_value(reader)?;
    }
    Ok(())
}

fn skip_element_value(reader: &mut ClassReader<'_>) -> Result<(), ClassParseError> {
    match reader.read_u1()? {
        b'B' | b'C' | b'D' | b'F' | b'I' | b'J' | b'S' | b'Z' | b's' | b'c' => {
            reader.skip(2)?;
        }
        b'e' => {
            reader.skip(4)?;
        }
        b'@' => {
            reader.read_u2()?; // type_index
            skip_annotation_body(reader)?;
        }
        b'[' => {
            let values = reader.read_u2()?;
            for _ in 0..values {
                skip_element_value(reader)?;
            }
        }
        other => {
            return Err(ClassParseError::InvalidDescriptor(format!(
                "unknown annotation element tag '{}'",
                other as char
            )))
        }
    }
    Ok(())
}

#[derive(Debug, Clone)]
enum Constant {
    Utf8(String),
    Class { name_index: u16 },
    Other,
    Unusable,
}

struct ConstantPool {
    entries: Vec<Constant>,
}

impl ConstantPool {
    fn parse(reader: &mut ClassReader<'_>) -> Result<Self, ClassParseError> {
        let count = reader.read_u2()? as usize;
        let mut entries = Vec::with_capacity(count);
        entries.push(Constant::Unusable); // index 0 unused

        let mut index = 1;
        while index < count {
            let tag = reader.read_u1()?;
            let entry = match tag {
                1 => {
                    let length = reader.read_u2()? as usize;
                    let bytes = reader.read_slice(length)?;
                    Constant::Utf8(decode_modified_utf8(bytes))
                }
                3 | 4 => {
                    reader.skip(4)?;
                    Constant::Other
                }
                5 | 6 => {
                    // Eight-byte constants occupy two pool slots.
                    reader.skip(8)?;
                    entries.push(Constant::Other);
                    index += 1;
                    Constant::Unusable
                }
                7 => {
                    let name_index = reader.read_u2()?;
                    Constant::Class { name_index }
                }
                8 | 16 | 19 | 20 => {
                    reader.skip(2)?;
                    Constant::Other
                }
                9 | 10 | 11 | 12 | 17 | 18 => {
                    reader.skip(4)?;
                    Constant::Other
                }
                15 => {
                    reader.skip(3)?;
                    Constant::Other
                }
                other => return Err(ClassParseError::UnsupportedConstant { tag: other }),
            };

            entries.push(entry);
            index += 1;
        }

        Ok(Self { entries })
    }

    fn get(&self, index: u16) -> Result<&Constant, ClassParseError> {
        self.entries
            .get(index as usize)
            .ok_or(ClassParseError::InvalidConstantIndex { index })
    }

    fn utf8(&self, index: u16) -> Result<&str, ClassParseError> {
        match self.get(index)? {
            Constant::Utf8(value) => Ok(value.as_str()),
            _ => Err(ClassParseError::InvalidConstantIndex { index }),
        }
    }

    fn class_name(&self, index: u16) -> Result<&str, ClassParseError> {
        match self.get(index)? {
            Constant::Class { name_index } => self.utf8(*name_index),
            _ => Err(ClassParseError::InvalidConstantIndex { index }),
        }
    }
}

/// Decodes the class-file flavour of UTF-8: NUL is encoded as two bytes and
/// supplementary characters as surrogate pairs. Invalid sequences become U+FFFD.
fn decode_modified_utf8(bytes: &[u8]) -> String {
    if let Ok(text) = std::str::from_utf8(bytes) {
        return text.to_string();
    }

    let mut units = Vec::with_capacity(bytes.len());
    let mut pos = 0;
    while pos < bytes.len() {
        let b0 = bytes[pos] as u16;
        let continuation = |at: usize| {
            bytes
                .get(at)
                .filter(|byte| *byte & 0xC0 == 0x80)
                .map(|byte| (*byte & 0x3F) as u16)
        };
        if b0 & 0x80 == 0 {
            units.push(b0);
            pos += 1;
        } else if b0 & 0xE0 == 0xC0 {
            match continuation(pos + 1) {
                Some(b1) => {
                    units.push(((b0 & 0x1F) << 6) | b1);
                    pos += 2;
                }
                None => {
                    units.push(0xFFFD);
                    pos += 1;
                }
            }
        } else if b0 & 0xF0 == 0xE0 {
            match (continuation(pos + 1), continuation(pos + 2)) {
                (Some(b1), Some(b2)) => {
                    units.push(((b0 & 0x0F) << 12) | (b1 << 6) | b2);
                    pos += 3;
                }
                _ => {
                    units.push(0xFFFD);
                    pos += 1;
                }
            }
        } else {
            units.push(0xFFFD);
            pos += 1;
        }
    }

    char::decode_utf16(units)
        .map(|unit| unit.unwrap_or(char::REPLACEMENT_CHARACTER))
        .collect()
}

struct ClassReader<'a> {
    data: &'a [u8],
    pos: usize,
}

impl<'a> ClassReader<'a> {
    fn new(data: &'a [u8]) -> Self {
        Self { data, pos: 0 }
    }

    fn expect_magic(&mut self) -> Result<(), ClassParseError> {
        const MAGIC: u32 = 0xCAFEBABE;
        let magic = self.read_u4()?;
        if magic != MAGIC {
            return Err(ClassParseError::InvalidMagic);
        }
        Ok(())
    }

    fn read_u1(&mut self) -> Result<u8, ClassParseError> {
        let value = *self
            .data
            .get(self.pos)
            .ok_or(ClassParseError::UnexpectedEof)?;
        self.pos += 1;
        Ok(value)
    }

    fn read_u2(&mut self) -> Result<u16, ClassParseError> {
        let bytes = self.read_slice(2)?;
        Ok(u16::from_be_bytes([bytes[0], bytes[1]]))
    }

    fn read_u4(&mut self) -> Result<u32, ClassParseError> {
        let bytes = self.read_slice(4)?;
        Ok(u32::from_be_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]))
    }

    fn read_slice(&mut self, len: usize) -> Result<&'a [u8], ClassParseError> {
        let end = self
            .pos
            .checked_add(len)
            .filter(|end| *end <= self.data.len())
            .ok_or(ClassParseError::UnexpectedEof)?;
        let slice = &self.data[self.pos..end];
        self.pos = end;
        Ok(slice)
    }

    fn skip(&mut self, len: usize) -> Result<(), ClassParseError> {
        self.read_slice(len).map(|_| ())
    }
}

fn skip_attributes(reader: &mut ClassReader<'_>, count: u16) -> Result<(), ClassParseError> {
    for _ in 0..count {
        reader.read_u2()?; // attribute_name_index
        let length = reader.read_u4()? as usize;
        reader.skip(length)?;
    }
    Ok(())
}

fn skip_member(reader: &mut ClassReader<'_>) -> Result<(), ClassParseError> {
    reader.read_u2()?; // access_flags
    reader.read_u2()?; // name_index
    reader.read_u2()?; // descriptor_index
    let attributes_count = reader.read_u2()?;
    skip_attributes(reader, attributes_count)?;
    Ok(())
}

/// Decodes the parameter list of a method descriptor such as `(I[Ljava/lang/String;)V`.
/// The return type is validated but discarded.
pub fn parse_method_parameters(descriptor: &str) -> Result<Vec<FieldType>, ClassParseError> {
    let mut parser = DescriptorParser::new(descriptor);
    parser.expect(b'(')?;
    let mut parameters = Vec::new();
    while !parser.peek_is(b')')? {
        parameters.push(parser.parse_type()?);
    }
    parser.expect(b')')?;
    if parser.peek_is(b'V')? {
        parser.pos += 1;
    } else {
        parser.parse_type()?;
    }

    if parser.remaining() != 0 {
        return Err(ClassParseError::InvalidDescriptor(descriptor.to_string()));
    }

    Ok(parameters)
}

struct DescriptorParser<'a> {
    descriptor: &'a str,
    bytes: &'a [u8],
    pos: usize,
}

impl<'a> DescriptorParser<'a> {
    fn new(descriptor: &'a str) -> Self {
        Self {
            descriptor,
            bytes: descriptor.as_bytes(),
            pos: 0,
        }
    }

    fn remaining(&self) -> usize {
        self.bytes.len().saturating_sub(self.pos)
    }

    fn truncated(&self) -> ClassParseError {
        ClassParseError::InvalidDescriptor(format!("truncated descriptor '{}'", self.descriptor))
    }

    fn expect(&mut self, expected: u8) -> Result<(), ClassParseError> {
        match self.bytes.get(self.pos) {
            Some(byte) if *byte == expected => {
                self.pos += 1;
                Ok(())
            }
            Some(_) => Err(ClassParseError::InvalidDescriptor(format!(
                "expected '{}' in descriptor '{}'",
                expected as char, self.descriptor
            ))),
            None => Err(self.truncated()),
        }
    }

    fn peek_is(&self, expected: u8) -> Result<bool, ClassParseError> {
        self.bytes
            .get(self.pos)
            .map(|byte| *byte == expected)
            .ok_or_else(|| self.truncated())
    }

    fn parse_type(&mut self) -> Result<FieldType, ClassParseError> {
        let start = *self.bytes.get(self.pos).ok_or_else(|| self.truncated())?;
        let primitive = match start {
            b'B' => "byte",
            b'C' => "char",
            b'D' => "double",
            b'F' => "float",
            b'I' => "int",
            b'J' => "long",
            b'S' => "short",
            b'Z' => "boolean",
            b'L' => return self.parse_reference_type(),
            b'[' => return self.parse_array_type(),
            _ => {
                return Err(ClassParseError::InvalidDescriptor(format!(
                    "unexpected descriptor tag '{}'",
                    start as char
                )))
            }
        };
        self.pos += 1;
        Ok(FieldType::Primitive(primitive))
    }

    fn parse_reference_type(&mut self) -> Result<FieldType, ClassParseError> {
        self.expect(b'L')?;
        let start = self.pos;
        let end = self.bytes[start..]
            .iter()
            .position(|byte| *byte == b';')
            .map(|offset| start + offset)
            .ok_or_else(|| {
                ClassParseError::InvalidDescriptor("unterminated reference descriptor".into())
            })?;
        self.pos = end + 1; // consume ';'
        Ok(FieldType::Reference(
            self.descriptor[start..end].replace('/', "."),
        ))
    }

    fn parse_array_type(&mut self) -> Result<FieldType, ClassParseError> {
        let mut dimensions = 0;
        while self.bytes.get(self.pos) == Some(&b'[') {
            dimensions += 1;
            self.pos += 1;
        }
        let element = self.parse_type()?;
        Ok(FieldType::Array {
            element: Box::new(element),
            dimensions,
        })
    }
}
