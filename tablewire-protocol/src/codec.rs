//! Encoder and decoder for table requests and responses.
//!
//! Requests arrive either as a JSON document or as form fields; both decode
//! into the same [`Request`]. Responses are always written as JSON.

use crate::error::ProtocolError;
use crate::form::{self, FormValues};
use crate::message::{Request, Response, Row};
use bytes::Bytes;

/// Encodes requests, responses and rows into JSON.
pub struct Encoder;

impl Encoder {
    /// Encodes a request as a JSON document.
    pub fn encode_request(request: &Request) -> Result<Bytes, ProtocolError> {
        Self::encode_json(request)
    }

    /// Encodes a response as a JSON document.
    pub fn encode_response(response: &Response) -> Result<Bytes, ProtocolError> {
        Self::encode_json(response)
    }

    /// Encodes a single row as a JSON object.
    pub fn encode_row(row: &Row) -> Result<Bytes, ProtocolError> {
        Self::encode_json(row)
    }

    /// Encodes any JSON-serializable value.
    pub fn encode_json<T: serde::Serialize>(value: &T) -> Result<Bytes, ProtocolError> {
        serde_json::to_vec(value)
            .map(Bytes::from)
            .map_err(ProtocolError::Encode)
    }
}

/// Decodes requests, responses and rows.
pub struct Decoder;

impl Decoder {
    /// Decodes a JSON request document.
    pub fn decode_request(payload: &[u8]) -> Result<Request, ProtocolError> {
        Ok(serde_json::from_slice(payload)?)
    }

    /// Decodes a JSON response document.
    pub fn decode_response(payload: &[u8]) -> Result<Response, ProtocolError> {
        Ok(serde_json::from_slice(payload)?)
    }

    /// Decodes a single row in either the array or the object shape.
    pub fn decode_row(payload: &[u8]) -> Result<Row, ProtocolError> {
        Ok(serde_json::from_slice(payload)?)
    }

    /// Decodes a request from already grouped form fields.
    pub fn decode_form<I, K, V>(fields: I) -> Result<Request, ProtocolError>
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: AsRef<[String]>,
    {
        form::decode_form(fields)
    }

    /// Decodes a request from an url-encoded query string or form body.
    pub fn decode_form_urlencoded(payload: &[u8]) -> Result<Request, ProtocolError> {
        form::decode_form(&FormValues::parse(payload))
    }
}
