//! The JSON document boundary (§6, §4.12).
//!
//! This module is deliberately thin: its only job is converting between the
//! wire format and [`crate::ir::Program`] with format fidelity, and turning
//! malformed documents into a [`MalformedIr`] with enough context to locate
//! the defect. No optimization logic lives here.

use std::collections::BTreeSet;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::Value as Json;

use crate::error::{MalformedIr, Result};
use crate::ir::{EffectInstr, Function, Instr, Literal, Opcode, Param, Program, Type, ValueInstr};

/// Parse a program document from its JSON text.
pub fn parse_program(json: &str) -> Result<Program> {
    let raw: RawProgram = serde_json::from_str(json)?;
    from_raw_program(raw)
}

/// Serialize a program back to its JSON text.
pub fn to_json(program: &Program, pretty: bool) -> Result<String> {
    let raw = to_raw_program(program);
    if pretty {
        Ok(serde_json::to_string_pretty(&raw)?)
    } else {
        Ok(serde_json::to_string(&raw)?)
    }
}

#[derive(Debug, Serialize, Deserialize)]
struct RawProgram {
    functions: Vec<RawFunction>,
}

#[derive(Debug, Serialize, Deserialize)]
struct RawFunction {
    name: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    args: Vec<RawParam>,
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    ret_type: Option<Type>,
    instrs: Vec<RawInstr>,
}

#[derive(Debug, Serialize, Deserialize)]
struct RawParam {
    name: String,
    #[serde(rename = "type")]
    ty: Type,
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct RawInstr {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    label: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    op: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    dest: Option<String>,
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    ty: Option<Type>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    value: Option<Json>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    args: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    labels: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    funcs: Vec<String>,
    /// Fields neither the wire contract nor this parser understands, kept
    /// verbatim so round-tripping never silently drops vendor extensions.
    #[serde(flatten)]
    extra: IndexMap<String, Json>,
}

fn from_raw_program(raw: RawProgram) -> Result<Program> {
    let functions = raw
        .functions
        .into_iter()
        .map(from_raw_function)
        .collect::<Result<Vec<_>>>()?;
    Ok(Program { functions })
}

fn from_raw_function(raw: RawFunction) -> Result<Function> {
    let name = raw.name;
    let args = raw
        .args
        .into_iter()
        .map(|p| Param { name: p.name, ty: p.ty })
        .collect::<Vec<_>>();

    let instrs = raw
        .instrs
        .into_iter()
        .enumerate()
        .map(|(index, r)| instr_from_raw(r, &name, index))
        .collect::<Result<Vec<_>>>()?;

    validate_labels(&name, &instrs)?;

    Ok(Function {
        name,
        args,
        ret_type: raw.ret_type,
        instrs,
    })
}

fn instr_from_raw(raw: RawInstr, function: &str, index: usize) -> Result<Instr> {
    if let Some(name) = raw.label {
        return Ok(Instr::Label { name });
    }

    let Some(op_str) = raw.op else {
        return Err(MalformedIr::MissingOpAndLabel {
            function: function.to_string(),
            index,
        }
        .into());
    };

    let op: Opcode = serde_json::from_value(Json::String(op_str.clone())).map_err(|_| {
        MalformedIr::UnknownOpcode {
            function: function.to_string(),
            index,
            op: op_str.clone(),
        }
    })?;

    if op == Opcode::Const {
        let ty = raw.ty.ok_or(MalformedIr::ConstMissingField {
            function: function.to_string(),
            index,
            field: "type",
        })?;
        let value = raw.value.ok_or(MalformedIr::ConstMissingField {
            function: function.to_string(),
            index,
            field: "value",
        })?;
        let dest = raw.dest.ok_or(MalformedIr::ConstMissingField {
            function: function.to_string(),
            index,
            field: "dest",
        })?;
        let literal = literal_from_json(&value, &ty).ok_or_else(|| MalformedIr::ConstValueTypeMismatch {
            function: function.to_string(),
            index,
            ty: ty.to_string(),
        })?;
        return Ok(Instr::Value(ValueInstr {
            op,
            dest,
            ty,
            args: raw.args,
            labels: raw.labels,
            funcs: raw.funcs,
            value: Some(literal),
            extra: raw.extra,
        }));
    }

    let produces_value_here = if op == Opcode::Call {
        raw.dest.is_some()
    } else {
        !op.is_always_effect()
    };

    if produces_value_here {
        let dest = raw.dest.ok_or(MalformedIr::ValueMissingField {
            function: function.to_string(),
            index,
            op: op.to_string(),
            field: "dest",
        })?;
        let ty = raw.ty.ok_or(MalformedIr::ValueMissingField {
            function: function.to_string(),
            index,
            op: op.to_string(),
            field: "type",
        })?;
        Ok(Instr::Value(ValueInstr {
            op,
            dest,
            ty,
            args: raw.args,
            labels: raw.labels,
            funcs: raw.funcs,
            value: None,
            extra: raw.extra,
        }))
    } else {
        Ok(Instr::Effect(EffectInstr {
            op,
            args: raw.args,
            labels: raw.labels,
            funcs: raw.funcs,
            extra: raw.extra,
        }))
    }
}

fn literal_from_json(value: &Json, ty: &Type) -> Option<Literal> {
    match ty {
        Type::Primitive(crate::ir::Primitive::Int) => value.as_i64().map(Literal::Int),
        Type::Primitive(crate::ir::Primitive::Bool) => value.as_bool().map(Literal::Bool),
        Type::Ptr { .. } => None,
    }
}

fn validate_labels(function: &str, instrs: &[Instr]) -> Result<()> {
    let defined: BTreeSet<&str> = instrs
        .iter()
        .filter_map(|i| match i {
            Instr::Label { name } => Some(name.as_str()),
            _ => None,
        })
        .collect();

    for (index, instr) in instrs.iter().enumerate() {
        let opcode = instr.opcode();
        let checks_labels = matches!(opcode, Some(Opcode::Jmp) | Some(Opcode::Br));
        if !checks_labels {
            continue;
        }
        for label in instr.labels() {
            if !defined.contains(label.as_str()) {
                return Err(MalformedIr::UndefinedLabel {
                    function: function.to_string(),
                    index,
                    label: label.clone(),
                }
                .into());
            }
        }
    }
    Ok(())
}

fn to_raw_program(program: &Program) -> RawProgram {
    RawProgram {
        functions: program.functions.iter().map(to_raw_function).collect(),
    }
}

fn to_raw_function(f: &Function) -> RawFunction {
    RawFunction {
        name: f.name.clone(),
        args: f
            .args
            .iter()
            .map(|p| RawParam { name: p.name.clone(), ty: p.ty.clone() })
            .collect(),
        ret_type: f.ret_type.clone(),
        instrs: f.instrs.iter().map(instr_to_raw).collect(),
    }
}

fn instr_to_raw(instr: &Instr) -> RawInstr {
    match instr {
        Instr::Label { name } => RawInstr {
            label: Some(name.clone()),
            ..Default::default()
        },
        Instr::Value(v) => RawInstr {
            op: Some(v.op.to_string()),
            dest: Some(v.dest.clone()),
            ty: Some(v.ty.clone()),
            value: v.value.map(|lit| serde_json::to_value(lit).expect("literal serializes")),
            args: v.args.clone(),
            labels: v.labels.clone(),
            funcs: v.funcs.clone(),
            extra: v.extra.clone(),
            ..Default::default()
        },
        Instr::Effect(e) => RawInstr {
            op: Some(e.op.to_string()),
            args: e.args.clone(),
            labels: e.labels.clone(),
            funcs: e.funcs.clone(),
            extra: e.extra.clone(),
            ..Default::default()
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> &'static str {
        r#"{
            "functions": [
                {
                    "name": "main",
                    "instrs": [
                        {"op": "const", "dest": "a", "type": "int", "value": 4},
                        {"op": "const", "dest": "b", "type": "int", "value": 2},
                        {"op": "add", "dest": "s", "type": "int", "args": ["a", "b"]},
                        {"op": "print", "args": ["s"]},
                        {"op": "ret"}
                    ]
                }
            ]
        }"#
    }

    #[test]
    fn parses_value_and_effect_instructions() {
        let program = parse_program(sample()).unwrap();
        assert_eq!(program.functions.len(), 1);
        let f = &program.functions[0];
        assert_eq!(f.instrs.len(), 5);
        assert!(matches!(f.instrs[0], Instr::Value(ref v) if v.op == Opcode::Const));
        assert!(matches!(f.instrs[3], Instr::Effect(ref e) if e.op == Opcode::Print));
    }

    #[test]
    fn roundtrip_is_identity_on_semantic_content() {
        let program = parse_program(sample()).unwrap();
        let json = to_json(&program, false).unwrap();
        let reparsed = parse_program(&json).unwrap();
        assert_eq!(program, reparsed);
    }

    #[test]
    fn rejects_unknown_opcode() {
        let bad = r#"{"functions":[{"name":"f","instrs":[{"op":"frobnicate"}]}]}"#;
        let err = parse_program(bad).unwrap_err();
        assert!(matches!(
            err,
            crate::error::Error::Malformed(MalformedIr::UnknownOpcode { .. })
        ));
    }

    #[test]
    fn rejects_missing_op_and_label() {
        let bad = r#"{"functions":[{"name":"f","instrs":[{}]}]}"#;
        let err = parse_program(bad).unwrap_err();
        assert!(matches!(
            err,
            crate::error::Error::Malformed(MalformedIr::MissingOpAndLabel { .. })
        ));
    }

    #[test]
    fn rejects_jump_to_undefined_label() {
        let bad = r#"{"functions":[{"name":"f","instrs":[{"op":"jmp","labels":["nowhere"]}]}]}"#;
        let err = parse_program(bad).unwrap_err();
        assert!(matches!(
            err,
            crate::error::Error::Malformed(MalformedIr::UndefinedLabel { .. })
        ));
    }

    #[test]
    fn call_with_dest_is_a_value_instruction() {
        let json = r#"{"functions":[{"name":"f","instrs":[
            {"op":"call","dest":"r","type":"int","funcs":["helper"],"args":[]},
            {"op":"ret"}
        ]}]}"#;
        let program = parse_program(json).unwrap();
        assert!(matches!(program.functions[0].instrs[0], Instr::Value(ref v) if v.op == Opcode::Call));
    }

    #[test]
    fn call_without_dest_is_an_effect_instruction() {
        let json = r#"{"functions":[{"name":"f","instrs":[
            {"op":"call","funcs":["helper"],"args":[]},
            {"op":"ret"}
        ]}]}"#;
        let program = parse_program(json).unwrap();
        assert!(matches!(program.functions[0].instrs[0], Instr::Effect(ref e) if e.op == Opcode::Call));
    }

    #[test]
    fn preserves_unknown_fields_through_roundtrip() {
        let json = r#"{"functions":[{"name":"f","instrs":[
            {"op":"const","dest":"a","type":"int","value":1,"pos":{"row":1,"col":2}},
            {"op":"ret"}
        ]}]}"#;
        let program = parse_program(json).unwrap();
        match &program.functions[0].instrs[0] {
            Instr::Value(v) => assert!(v.extra.contains_key("pos")),
            other => panic!("expected value instruction, got {other:?}"),
        }

        let out = to_json(&program, false).unwrap();
        assert!(out.contains("\"pos\""));
    }
}
