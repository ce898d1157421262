use alloy::{
    dyn_abi::{DynSolValue, EventExt, FunctionExt, JsonAbiExt, Word},
    json_abi::{Constructor, Event, Function, Param},
    primitives::{Address, Bytes, I256, U256},
};
use serde_json::{Map, Value};
use std::str::FromStr;

use super::{options::big_number_hex, Log};
use crate::error::{BindingError, Result};

fn abi_error(message: impl Into<String>) -> BindingError {
    BindingError::Abi(message.into())
}

/// Calldata (selector + arguments) for a function.
pub fn encode_function_call(function: &Function, args: &[Value]) -> Result<Bytes> {
    let inputs = encode_arguments(&function.name, &function.inputs, args)?;
    let encoded = function
        .abi_encode_input(&inputs)
        .map_err(|e| abi_error(format!("Failed to encode function inputs: {}", e)))?;

    Ok(encoded.into())
}

/// ABI-encoded constructor arguments, appended to creation bytecode.
pub fn encode_constructor_args(constructor: Option<&Constructor>, args: &[Value]) -> Result<Vec<u8>> {
    let Some(constructor) = constructor else {
        if args.is_empty() {
            return Ok(Vec::new());
        }
        return Err(abi_error(format!(
            "Contract has no constructor but {} arguments were given",
            args.len()
        )));
    };

    let inputs = encode_arguments("constructor", &constructor.inputs, args)?;
    constructor
        .abi_encode_input(&inputs)
        .map_err(|e| abi_error(format!("Failed to encode constructor arguments: {}", e)))
}

fn encode_arguments(name: &str, params: &[Param], args: &[Value]) -> Result<Vec<DynSolValue>> {
    if args.len() != params.len() {
        let expected: Vec<String> = params
            .iter()
            .map(|input| format!("{} {}", input.ty, input.name))
            .collect();

        return Err(abi_error(format!(
            "Parameter count mismatch for '{}': expected {} parameters, got {}.\nExpected parameters: [{}]",
            name,
            params.len(),
            args.len(),
            expected.join(", ")
        )));
    }

    params
        .iter()
        .zip(args)
        .enumerate()
        .map(|(i, (param, arg))| {
            json_to_dyn_sol_value(arg, &param.ty).map_err(|e| {
                abi_error(format!(
                    "Invalid parameter #{} ('{}' of type '{}'): {}",
                    i + 1,
                    param.name,
                    param.ty,
                    e
                ))
            })
        })
        .collect()
}

/// Decode `eth_call` output. One output decodes to a bare value, several to
/// an array, none (or empty data) to null.
pub fn decode_function_result(function: &Function, output: &[u8]) -> Result<Value> {
    if output.is_empty() {
        return Ok(Value::Null);
    }

    let decoded = function
        .abi_decode_output(output, false)
        .map_err(|e| abi_error(format!("Failed to decode output of '{}': {}", function.name, e)))?;

    dyn_sol_values_to_json(&decoded)
}

/// Decode a log into an object keyed by event input names (positional index
/// for unnamed inputs).
pub fn decode_event(event: &Event, log: &Log) -> Result<Value> {
    let decoded = event
        .decode_log_parts(log.topics.iter().copied(), &log.data, false)
        .map_err(|e| abi_error(format!("Failed to decode event '{}': {}", event.name, e)))?;

    let mut indexed = decoded.indexed.iter();
    let mut body = decoded.body.iter();
    let mut fields = Map::new();
    for (i, input) in event.inputs.iter().enumerate() {
        let value = if input.indexed {
            indexed.next()
        } else {
            body.next()
        };
        let Some(value) = value else {
            return Err(abi_error(format!(
                "Event '{}' is missing input '{}'",
                event.name, input.name
            )));
        };
        let key = if input.name.is_empty() {
            i.to_string()
        } else {
            input.name.clone()
        };
        fields.insert(key, dyn_sol_value_to_json(value)?);
    }

    Ok(Value::Object(fields))
}

fn parse_bits(ty: &str, prefix: &str, default: usize) -> std::result::Result<usize, String> {
    let suffix = &ty[prefix.len()..];
    if suffix.is_empty() {
        return Ok(default);
    }
    suffix
        .parse()
        .map_err(|_| format!("Unsupported Solidity type: {}", ty))
}

/// Width of `uint<N>`/`int<N>`: a multiple of 8 from 8 to 256.
fn integer_bits(ty: &str, prefix: &str) -> std::result::Result<usize, String> {
    match parse_bits(ty, prefix, 256)? {
        bits @ 8..=256 if bits % 8 == 0 => Ok(bits),
        _ => Err(format!("Unsupported Solidity type: {}", ty)),
    }
}

fn parse_u256(value: &Value) -> std::result::Result<U256, String> {
    if let Some(hex) = big_number_hex(value) {
        return U256::from_str(hex).map_err(|_| format!("Invalid big number: {}", hex));
    }
    match value {
        Value::Number(n) => n
            .as_u64()
            .map(U256::from)
            .ok_or_else(|| format!("Invalid uint value: {}", n)),
        Value::String(s) => U256::from_str(s.trim()).map_err(|_| format!("Invalid uint string: {}", s)),
        _ => Err("Uint must be a number or string".to_string()),
    }
}

fn parse_i256(value: &Value) -> std::result::Result<I256, String> {
    match value {
        Value::Number(n) => n
            .as_i64()
            .map(|n| n.to_string())
            .ok_or_else(|| format!("Invalid int value: {}", n))
            .and_then(|s| I256::from_dec_str(&s).map_err(|e| e.to_string())),
        Value::String(s) => {
            I256::from_dec_str(s.trim()).map_err(|_| format!("Invalid int string: {}", s))
        }
        _ => Err("Int must be a number or string".to_string()),
    }
}

fn parse_hex_bytes(value: &Value) -> std::result::Result<Vec<u8>, String> {
    let hex_str = value
        .as_str()
        .ok_or_else(|| "Bytes must be a hex string".to_string())?;
    hex::decode(hex_str.trim_start_matches("0x")).map_err(|_| format!("Invalid hex string: {}", hex_str))
}

/// Convert a JSON argument to a `DynSolValue` of the given Solidity type.
pub fn json_to_dyn_sol_value(value: &Value, sol_type: &str) -> std::result::Result<DynSolValue, String> {
    // arrays first: `uint256[]`, `address[3]`
    if let Some(open) = sol_type.rfind('[') {
        if sol_type.ends_with(']') {
            let element_type = &sol_type[..open];
            let size = &sol_type[open + 1..sol_type.len() - 1];
            let array = value
                .as_array()
                .ok_or_else(|| "Array parameter must be an array".to_string())?;
            let elements = array
                .iter()
                .map(|element| json_to_dyn_sol_value(element, element_type))
                .collect::<std::result::Result<Vec<_>, _>>()?;

            if size.is_empty() {
                return Ok(DynSolValue::Array(elements));
            }
            let size: usize = size
                .parse()
                .map_err(|_| format!("Unsupported Solidity type: {}", sol_type))?;
            if elements.len() != size {
                return Err(format!(
                    "Fixed array {} expects {} elements, got {}",
                    sol_type,
                    size,
                    elements.len()
                ));
            }
            return Ok(DynSolValue::FixedArray(elements));
        }
    }

    match sol_type {
        "address" => {
            let addr_str = value
                .as_str()
                .ok_or_else(|| "Address must be a string".to_string())?;
            let address = Address::from_str(addr_str.trim())
                .map_err(|e| format!("Invalid address '{}': {}", addr_str, e))?;
            Ok(DynSolValue::Address(address))
        }
        "bool" => value
            .as_bool()
            .map(DynSolValue::Bool)
            .ok_or_else(|| "Bool parameter must be a boolean".to_string()),
        "string" => value
            .as_str()
            .map(|s| DynSolValue::String(s.to_string()))
            .ok_or_else(|| "String parameter must be a string".to_string()),
        "bytes" => Ok(DynSolValue::Bytes(parse_hex_bytes(value)?)),
        ty if ty.starts_with("uint") => {
            let bits = integer_bits(ty, "uint")?;
            let n = parse_u256(value)?;
            if n.bit_len() > bits {
                return Err(format!("{} does not fit in {}", n, ty));
            }
            Ok(DynSolValue::Uint(n, bits))
        }
        ty if ty.starts_with("int") => {
            let bits = integer_bits(ty, "int")?;
            let n = parse_i256(value)?;
            if bits < 256 {
                let bound = I256::from_raw(U256::from(1) << (bits - 1));
                if n < -bound || n >= bound {
                    return Err(format!("{} does not fit in {}", n, ty));
                }
            }
            Ok(DynSolValue::Int(n, bits))
        }
        ty if ty.starts_with("bytes") => {
            let size = parse_bits(ty, "bytes", 32)?;
            if size == 0 || size > 32 {
                return Err(format!("Unsupported Solidity type: {}", ty));
            }
            let bytes = parse_hex_bytes(value)?;
            if bytes.len() > size {
                return Err(format!("{} value is {} bytes long", ty, bytes.len()));
            }

            // left-aligned, zero padded
            let mut word_bytes = [0u8; 32];
            word_bytes[..bytes.len()].copy_from_slice(&bytes);
            Ok(DynSolValue::FixedBytes(Word::from(word_bytes), size))
        }
        _ => Err(format!("Unsupported Solidity type: {}", sol_type)),
    }
}

/// Convert decoded values to JSON
pub fn dyn_sol_values_to_json(values: &[DynSolValue]) -> Result<Value> {
    if values.len() == 1 {
        dyn_sol_value_to_json(&values[0])
    } else {
        values
            .iter()
            .map(dyn_sol_value_to_json)
            .collect::<Result<Vec<_>>>()
            .map(Value::Array)
    }
}

pub fn dyn_sol_value_to_json(value: &DynSolValue) -> Result<Value> {
    match value {
        DynSolValue::Address(addr) => Ok(Value::String(format!("0x{:x}", addr))),
        DynSolValue::Uint(num, _) => Ok(Value::String(num.to_string())),
        DynSolValue::Int(num, _) => Ok(Value::String(num.to_string())),
        DynSolValue::Bool(b) => Ok(Value::Bool(*b)),
        DynSolValue::String(s) => Ok(Value::String(s.clone())),
        DynSolValue::Bytes(bytes) => Ok(Value::String(format!("0x{}", hex::encode(bytes)))),
        DynSolValue::FixedBytes(word, size) => Ok(Value::String(format!(
            "0x{}",
            hex::encode(&word[..*size])
        ))),
        DynSolValue::Array(items) | DynSolValue::FixedArray(items) | DynSolValue::Tuple(items) => items
            .iter()
            .map(dyn_sol_value_to_json)
            .collect::<Result<Vec<_>>>()
            .map(Value::Array),
        _ => Err(abi_error(format!("Unsupported DynSolValue type: {:?}", value))),
    }
}
