/*
 * SPDX-FileCopyrightText: 2026 Wavelens GmbH <info@wavelens.io>
 *
 * SPDX-License-Identifier: AGPL-3.0-only
 */

//! XML-RPC encoding as spoken by the koji hub, including the `nil` and `i8`
//! extensions and koji's keyword argument convention.

use quick_xml::Reader;
use quick_xml::escape::escape;
use quick_xml::events::Event;
use std::collections::BTreeMap;

use super::error::KojiError;

#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Nil,
    Bool(bool),
    Int(i64),
    Double(f64),
    String(String),
    Array(Vec<Value>),
    Struct(BTreeMap<String, Value>),
}

impl Value {
    /// Builds the trailing struct koji unpacks into keyword arguments.
    pub fn kwargs<I, K>(args: I) -> Value
    where
        I: IntoIterator<Item = (K, Value)>,
        K: Into<String>,
    {
        let mut map: BTreeMap<String, Value> =
            args.into_iter().map(|(k, v)| (k.into(), v)).collect();
        map.insert("__starstar".to_string(), Value::Bool(true));
        Value::Struct(map)
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Value::Int(i) => Some(*i),
            _ => None,
        }
    }

    pub fn as_i32(&self) -> Option<i32> {
        self.as_i64().and_then(|i| i32::try_from(i).ok())
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s.as_str()),
            _ => None,
        }
    }

    pub fn as_array(&self) -> Option<&[Value]> {
        match self {
            Value::Array(values) => Some(values.as_slice()),
            _ => None,
        }
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        match self {
            Value::Struct(map) => map.get(key),
            _ => None,
        }
    }

    pub fn is_nil(&self) -> bool {
        matches!(self, Value::Nil)
    }
}

impl From<i32> for Value {
    fn from(i: i32) -> Self {
        Value::Int(i.into())
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::String(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::String(s)
    }
}

pub fn encode_call(method: &str, params: &[Value]) -> String {
    let mut out = String::from("<?xml version=\"1.0\"?>\n<methodCall><methodName>");
    out.push_str(&escape(method));
    out.push_str("</methodName><params>");

    for param in params {
        out.push_str("<param>");
        write_value(&mut out, param);
        out.push_str("</param>");
    }

    out.push_str("</params></methodCall>");
    out
}

fn write_value(out: &mut String, value: &Value) {
    out.push_str("<value>");

    match value {
        Value::Nil => out.push_str("<nil/>"),
        Value::Bool(b) => {
            out.push_str("<boolean>");
            out.push_str(if *b { "1" } else { "0" });
            out.push_str("</boolean>");
        }
        Value::Int(i) => {
            let tag = if i32::try_from(*i).is_ok() { "int" } else { "i8" };
            out.push_str(&format!("<{tag}>{i}</{tag}>"));
        }
        Value::Double(d) => out.push_str(&format!("<double>{d}</double>")),
        Value::String(s) => {
            out.push_str("<string>");
            out.push_str(&escape(s.as_str()));
            out.push_str("</string>");
        }
        Value::Array(values) => {
            out.push_str("<array><data>");
            for v in values {
                write_value(out, v);
            }
            out.push_str("</data></array>");
        }
        Value::Struct(map) => {
            out.push_str("<struct>");
            for (name, v) in map {
                out.push_str("<member><name>");
                out.push_str(&escape(name.as_str()));
                out.push_str("</name>");
                write_value(out, v);
                out.push_str("</member>");
            }
            out.push_str("</struct>");
        }
    }

    out.push_str("</value>");
}

/// Decodes a `methodResponse` document. A `<fault>` is returned as
/// [`KojiError::Fault`].
pub fn decode_response(xml: &str) -> Result<Value, KojiError> {
    let mut parser = Parser::new(xml);

    parser.expect_start(b"methodResponse")?;

    match parser.next_significant()? {
        Event::Start(e) if e.name().as_ref() == b"params" => {
            parser.expect_start(b"param")?;
            parser.expect_start(b"value")?;
            let value = parser.parse_value()?;
            parser.expect_end(b"param")?;
            parser.expect_end(b"params")?;
            parser.expect_end(b"methodResponse")?;
            Ok(value)
        }
        Event::Start(e) if e.name().as_ref() == b"fault" => {
            parser.expect_start(b"value")?;
            let fault = parser.parse_value()?;

            let code = fault
                .get("faultCode")
                .and_then(Value::as_i32)
                .ok_or_else(|| KojiError::decode("fault without faultCode"))?;
            let message = fault
                .get("faultString")
                .and_then(Value::as_str)
                .unwrap_or_default()
                .to_string();

            Err(KojiError::Fault { code, message })
        }
        other => Err(unexpected("params or fault", &other)),
    }
}

struct Parser<'a> {
    reader: Reader<&'a [u8]>,
}

impl<'a> Parser<'a> {
    fn new(xml: &'a str) -> Self {
        Parser {
            reader: Reader::from_str(xml),
        }
    }

    /// Next event that carries structure, skipping the declaration, comments
    /// and whitespace between elements.
    fn next_significant(&mut self) -> Result<Event<'a>, KojiError> {
        loop {
            match self.reader.read_event()? {
                Event::Decl(_) | Event::Comment(_) | Event::PI(_) | Event::DocType(_) => continue,
                Event::Text(t) if t.iter().all(u8::is_ascii_whitespace) => continue,
                event => return Ok(event),
            }
        }
    }

    fn expect_start(&mut self, name: &[u8]) -> Result<(), KojiError> {
        match self.next_significant()? {
            Event::Start(e) if e.name().as_ref() == name => Ok(()),
            other => Err(unexpected(&String::from_utf8_lossy(name), &other)),
        }
    }

    fn expect_end(&mut self, name: &[u8]) -> Result<(), KojiError> {
        match self.next_significant()? {
            Event::End(e) if e.name().as_ref() == name => Ok(()),
            other => Err(unexpected(
                &format!("/{}", String::from_utf8_lossy(name)),
                &other,
            )),
        }
    }

    /// Reads character data up to the closing tag `name`.
    fn read_text(&mut self, name: &[u8]) -> Result<String, KojiError> {
        let mut text = String::new();
        loop {
            match self.reader.read_event()? {
                Event::Text(t) => text.push_str(&t.unescape()?),
                Event::CData(c) => text.push_str(&String::from_utf8_lossy(&c)),
                Event::Comment(_) => continue,
                Event::End(e) if e.name().as_ref() == name => return Ok(text),
                other => {
                    return Err(unexpected(
                        &format!("text of {}", String::from_utf8_lossy(name)),
                        &other,
                    ));
                }
            }
        }
    }

    /// Parses the content of a `<value>` whose start tag was consumed, up to
    /// and including its end tag.
    fn parse_value(&mut self) -> Result<Value, KojiError> {
        let mut untyped = String::new();

        loop {
            match self.reader.read_event()? {
                Event::Text(t) => untyped.push_str(&t.unescape()?),
                Event::CData(c) => untyped.push_str(&String::from_utf8_lossy(&c)),
                Event::Comment(_) => continue,
                Event::End(e) if e.name().as_ref() == b"value" => {
                    return Ok(Value::String(untyped));
                }
                Event::Empty(e) => {
                    let value = match e.name().as_ref() {
                        b"nil" => Value::Nil,
                        b"string" => Value::String(String::new()),
                        b"array" => Value::Array(vec![]),
                        b"struct" => Value::Struct(BTreeMap::new()),
                        other => {
                            return Err(KojiError::decode(format!(
                                "empty <{}/> is not a value",
                                String::from_utf8_lossy(other)
                            )));
                        }
                    };
                    self.expect_end(b"value")?;
                    return Ok(value);
                }
                Event::Start(e) => {
                    let name = e.name().as_ref().to_vec();
                    let value = self.parse_typed(&name)?;
                    self.expect_end(b"value")?;
                    return Ok(value);
                }
                other => return Err(unexpected("value content", &other)),
            }
        }
    }

    fn parse_typed(&mut self, name: &[u8]) -> Result<Value, KojiError> {
        match name {
            b"int" | b"i4" | b"i8" => {
                let text = self.read_text(name)?;
                text.trim()
                    .parse::<i64>()
                    .map(Value::Int)
                    .map_err(|_| KojiError::decode(format!("invalid integer `{}`", text)))
            }
            b"boolean" => match self.read_text(name)?.trim() {
                "1" => Ok(Value::Bool(true)),
                "0" => Ok(Value::Bool(false)),
                other => Err(KojiError::decode(format!("invalid boolean `{}`", other))),
            },
            b"double" => {
                let text = self.read_text(name)?;
                text.trim()
                    .parse::<f64>()
                    .map(Value::Double)
                    .map_err(|_| KojiError::decode(format!("invalid double `{}`", text)))
            }
            b"string" | b"dateTime.iso8601" | b"base64" => Ok(Value::String(self.read_text(name)?)),
            b"nil" => {
                self.expect_end(b"nil")?;
                Ok(Value::Nil)
            }
            b"array" => self.parse_array(),
            b"struct" => self.parse_struct(),
            other => Err(KojiError::decode(format!(
                "unknown value type <{}>",
                String::from_utf8_lossy(other)
            ))),
        }
    }

    fn parse_array(&mut self) -> Result<Value, KojiError> {
        let mut values = vec![];

        match self.next_significant()? {
            Event::Empty(e) if e.name().as_ref() == b"data" => {
                self.expect_end(b"array")?;
                return Ok(Value::Array(values));
            }
            Event::Start(e) if e.name().as_ref() == b"data" => {}
            other => return Err(unexpected("data", &other)),
        }

        loop {
            match self.next_significant()? {
                Event::Start(e) if e.name().as_ref() == b"value" => {
                    values.push(self.parse_value()?);
                }
                Event::Empty(e) if e.name().as_ref() == b"value" => {
                    values.push(Value::String(String::new()));
                }
                Event::End(e) if e.name().as_ref() == b"data" => break,
                other => return Err(unexpected("value or /data", &other)),
            }
        }

        self.expect_end(b"array")?;
        Ok(Value::Array(values))
    }

    fn parse_struct(&mut self) -> Result<Value, KojiError> {
        let mut map = BTreeMap::new();

        loop {
            match self.next_significant()? {
                Event::Start(e) if e.name().as_ref() == b"member" => {
                    self.expect_start(b"name")?;
                    let name = self.read_text(b"name")?;

                    let value = match self.next_significant()? {
                        Event::Start(e) if e.name().as_ref() == b"value" => self.parse_value()?,
                        Event::Empty(e) if e.name().as_ref() == b"value" => {
                            Value::String(String::new())
                        }
                        other => return Err(unexpected("value", &other)),
                    };

                    self.expect_end(b"member")?;
                    map.insert(name, value);
                }
                Event::End(e) if e.name().as_ref() == b"struct" => break,
                other => return Err(unexpected("member or /struct", &other)),
            }
        }

        Ok(Value::Struct(map))
    }
}

fn unexpected(expected: &str, found: &Event<'_>) -> KojiError {
    let found = match found {
        Event::Start(e) | Event::Empty(e) => {
            format!("<{}>", String::from_utf8_lossy(e.name().as_ref()))
        }
        Event::End(e) => format!("</{}>", String::from_utf8_lossy(e.name().as_ref())),
        Event::Eof => "end of document".to_string(),
        _ => "character data".to_string(),
    };

    KojiError::decode(format!("expected {}, found {}", expected, found))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_encode_call_with_kwargs() {
        let xml = encode_call(
            "getTaskInfo",
            &[Value::from(42), Value::kwargs([("request", Value::from(true))])],
        );

        assert!(xml.starts_with("<?xml version=\"1.0\"?>"));
        assert!(xml.contains("<methodName>getTaskInfo</methodName>"));
        assert!(xml.contains("<param><value><int>42</int></value></param>"));
        assert!(xml.contains("<member><name>__starstar</name><value><boolean>1</boolean></value></member>"));
        assert!(xml.contains("<member><name>request</name><value><boolean>1</boolean></value></member>"));
    }

    #[test]
    fn test_encode_escapes_strings() {
        let xml = encode_call("tagBuild", &[Value::from("a<b&c")]);
        assert!(xml.contains("<string>a&lt;b&amp;c</string>"));
    }

    #[test]
    fn test_encode_large_int_as_i8() {
        let xml = encode_call("getBuild", &[Value::Int(1 << 40)]);
        assert!(xml.contains("<i8>1099511627776</i8>"));
    }

    #[test]
    fn test_decode_struct_response() {
        let xml = r#"<?xml version='1.0'?>
<methodResponse>
<params>
<param>
<value><struct>
<member>
<name>state</name>
<value><int>2</int></value>
</member>
<member>
<name>method</name>
<value><string>build</string></value>
</member>
<member>
<name>owner</name>
<value><nil/></value>
</member>
</struct></value>
</param>
</params>
</methodResponse>
"#;

        let value = decode_response(xml).unwrap();
        assert_eq!(value.get("state").and_then(Value::as_i64), Some(2));
        assert_eq!(value.get("method").and_then(Value::as_str), Some("build"));
        assert!(value.get("owner").unwrap().is_nil());
    }

    #[test]
    fn test_decode_array_of_untyped_strings() {
        let xml = "<methodResponse><params><param><value><array><data>\
                   <value>one</value><value><string></string></value><value><i8>5</i8></value>\
                   </data></array></value></param></params></methodResponse>";

        let value = decode_response(xml).unwrap();
        assert_eq!(
            value,
            Value::Array(vec![
                Value::String("one".to_string()),
                Value::String(String::new()),
                Value::Int(5),
            ])
        );
    }

    #[test]
    fn test_decode_empty_array() {
        let xml = "<methodResponse><params><param><value><array><data/></array></value></param></params></methodResponse>";
        assert_eq!(decode_response(xml).unwrap(), Value::Array(vec![]));
    }

    #[test]
    fn test_decode_fault() {
        let xml = r#"<?xml version='1.0'?>
<methodResponse>
<fault>
<value><struct>
<member><name>faultCode</name><value><int>1005</int></value></member>
<member><name>faultString</name><value><string>error building package (arch x86_64)</string></value></member>
</struct></value>
</fault>
</methodResponse>"#;

        match decode_response(xml) {
            Err(KojiError::Fault { code, message }) => {
                assert_eq!(code, 1005);
                assert_eq!(message, "error building package (arch x86_64)");
            }
            other => panic!("expected fault, got {:?}", other),
        }
    }

    #[test]
    fn test_decode_rejects_garbage() {
        assert!(decode_response("<html><body>502 Bad Gateway</body></html>").is_err());
    }
}
