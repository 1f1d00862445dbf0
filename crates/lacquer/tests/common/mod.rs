#![allow(dead_code)]

use lacquer::{Constructible, Dsl, Lacquer, TargetType};
use serde_json::{Map, Value};

/// Installs a test subscriber once; later calls are no-ops.
pub fn init_tracing() {
	let _ = tracing_subscriber::fmt()
		.with_test_writer()
		.with_max_level(tracing::Level::TRACE)
		.try_init();
}

/// Fresh facade with the fixture types resolvable by name.
pub fn setup() -> Lacquer {
	init_tracing();
	let lacquer = Lacquer::new();
	lacquer.types().insert::<Photo>();
	lacquer.types().insert::<Person>();
	lacquer.types().insert::<File>();
	lacquer.types().insert::<Tester>();
	lacquer
}

#[derive(Debug, Default, Clone, PartialEq)]
pub struct Photo {
	pub caption: Option<String>,
	pub metadata: Map<String, Value>,
	pub people: Vec<Person>,
}

impl Photo {
	pub fn get(&self, key: &str) -> Option<&Value> {
		self.metadata.get(key)
	}

	pub fn add_person(&mut self, name: &str) -> &mut Person {
		self.people.push(Person::new(name));
		let last = self.people.len() - 1;
		&mut self.people[last]
	}
}

impl Constructible for Photo {
	fn construct(args: &[Value]) -> anyhow::Result<Self> {
		let caption = match args.first() {
			None | Some(Value::Null) => None,
			Some(Value::String(caption)) => Some(caption.clone()),
			Some(other) => anyhow::bail!("caption must be a string, got {other}"),
		};
		let metadata = match args.get(1) {
			None => Map::new(),
			Some(Value::Object(metadata)) => metadata.clone(),
			Some(other) => anyhow::bail!("metadata must be an object, got {other}"),
		};
		Ok(Self {
			caption,
			metadata,
			people: Vec::new(),
		})
	}
}

impl Dsl for Photo {}

#[derive(Debug, Default, Clone, PartialEq)]
pub struct Person {
	pub name: String,
	pub age: Option<u32>,
}

impl Person {
	pub fn new(name: &str) -> Self {
		Self {
			name: name.to_string(),
			age: None,
		}
	}
}

impl Constructible for Person {
	fn construct(args: &[Value]) -> anyhow::Result<Self> {
		let name = args
			.first()
			.and_then(Value::as_str)
			.ok_or_else(|| anyhow::anyhow!("person needs a name"))?;
		Ok(Self::new(name))
	}
}

impl Dsl for Person {}

#[derive(Debug, Default)]
pub struct File {
	pub path: String,
}

impl Constructible for File {
	fn construct(args: &[Value]) -> anyhow::Result<Self> {
		Ok(Self {
			path: args.first().and_then(Value::as_str).unwrap_or_default().to_string(),
		})
	}
}

#[derive(Debug, Default)]
pub struct Tester;

impl Constructible for Tester {
	fn construct(_: &[Value]) -> anyhow::Result<Self> {
		Ok(Self)
	}
}

impl Dsl for Tester {}

pub fn target<T: Constructible>() -> TargetType {
	TargetType::of::<T>()
}
