#![allow(dead_code)]

use robomodel::{Context, Model, ModelEnum};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Default, PartialEq, ModelEnum, Serialize, Deserialize)]
pub enum Answer {
    #[default]
    Life,
    Universe,
    #[model(rename = "everything")]
    Everything,
}

#[derive(Debug, Clone, Default, PartialEq, Model, Serialize, Deserialize)]
pub struct TestModel {
    pub string_field: String,
    pub boolean_field: bool,
    pub byte_field: i8,
    pub short_field: i16,
    pub int_field: i32,
    pub long_field: i64,
    pub float_field: f32,
    pub double_field: f64,
    pub answer: Answer,
    pub maybe_answer: Option<Answer>,
    #[model(json)]
    pub tags: Vec<String>,
    pub note: Option<String>,
    pub secret: String,
    #[model(exclude)]
    pub cache: String,
    hidden: i32,
}

impl TestModel {
    pub fn sample() -> Self {
        Self {
            string_field: "Tapioca".to_string(),
            boolean_field: true,
            byte_field: -12,
            short_field: 1_234,
            int_field: 42,
            long_field: 9_000_000_000,
            float_field: 42.42,
            double_field: -3.25,
            answer: Answer::Universe,
            maybe_answer: Some(Answer::Everything),
            tags: vec!["a".to_string(), "b".to_string()],
            note: Some("remember".to_string()),
            secret: "s3".to_string(),
            cache: String::new(),
            hidden: 0,
        }
    }

    pub fn with_hidden(mut self, hidden: i32) -> Self {
        self.hidden = hidden;
        self
    }

    pub fn hidden(&self) -> i32 {
        self.hidden
    }
}

#[derive(Debug, Default, Model)]
#[model(table = "whitelisted", exclude_by_default)]
pub struct Whitelisted {
    #[model(save)]
    pub kept: String,
    pub dropped: String,
    #[model(save, exclude)]
    pub never: String,
    #[model(save, column = "renamed")]
    original: i32,
}

impl Whitelisted {
    pub fn set_original(&mut self, value: i32) {
        self.original = value;
    }

    pub fn original(&self) -> i32 {
        self.original
    }
}

#[derive(Debug, Default, Model)]
#[model(database = "elsewhere")]
pub struct Elsewhere {
    pub label: String,
}

#[derive(Debug, Default, Model)]
pub struct Clashing {
    pub _id: i64,
}

#[derive(Debug, Default, Model)]
pub struct Duplicated {
    pub name: String,
    #[model(column = "NAME")]
    pub other: String,
}

#[derive(Debug, Default, Model)]
pub struct Keyworded {
    pub group: String,
}

pub fn context() -> Context {
    Context::in_memory()
}
