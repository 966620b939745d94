mod common;

use common::{context, Answer, Clashing, Duplicated, Elsewhere, Keyworded, TestModel, Whitelisted};
use robomodel::codec::Value;
use robomodel::{Error, Manager, Model, Query, State, UNSAVED_ID};

#[test]
fn test_save_then_find_round_trips_every_type() {
    let context = context();
    let models = Manager::<TestModel>::new(&context);

    let mut record = models.create_with(TestModel::sample().with_hidden(7));
    record.save().unwrap();

    let found = models.find(record.id()).unwrap();
    assert_eq!(found.value(), &TestModel::sample());
    assert_eq!(found.hidden(), 0);
}

#[test]
fn test_fresh_record_is_unsaved_until_saved() {
    let context = context();
    let models = Manager::<TestModel>::new(&context);

    let mut record = models.create();
    assert_eq!(record.state(), State::Unsaved);
    assert_eq!(record.id(), UNSAVED_ID);
    assert!(matches!(record.delete(), Err(Error::State(_))));

    record.save().unwrap();
    assert_eq!(record.state(), State::Saved);
    assert!(record.id() >= 0);
}

#[test]
fn test_second_save_updates_in_place() {
    let context = context();
    let models = Manager::<TestModel>::new(&context);

    let mut record = models.create_with(TestModel::sample());
    record.save().unwrap();
    let id = record.id();

    record.int_field = 43;
    record.save().unwrap();

    assert_eq!(record.id(), id);
    assert_eq!(models.count().unwrap(), 1);
    assert_eq!(models.find(id).unwrap().int_field, 43);
}

#[test]
fn test_find_on_empty_table_is_not_found() {
    let context = context();
    let models = Manager::<TestModel>::new(&context);

    match models.find(5) {
        Err(Error::NotFound { type_name, id }) => {
            assert_eq!(type_name, "TestModel");
            assert_eq!(id, 5);
        }
        other => panic!("expected not found, got {other:?}"),
    }
}

#[test]
fn test_reload_sees_changes_from_another_instance() {
    let context = context();
    let models = Manager::<TestModel>::new(&context);

    let mut first = models.create_with(TestModel::sample());
    first.save().unwrap();

    let mut second = models.find(first.id()).unwrap();
    second.string_field = "changed".to_string();
    second.save().unwrap();

    first.reload().unwrap();
    assert_eq!(first.string_field, "changed");
}

#[test]
fn test_deleted_record_is_gone_and_unusable() {
    let context = context();
    let models = Manager::<TestModel>::new(&context);

    let mut record = models.create_with(TestModel::sample());
    record.save().unwrap();
    let id = record.id();
    record.delete().unwrap();

    assert_eq!(record.state(), State::Deleted);
    assert!(models.find(id).unwrap_err().is_not_found());
    assert!(matches!(record.save(), Err(Error::State(_))));
    assert!(matches!(record.reload(), Err(Error::State(_))));
}

#[test]
fn test_lagging_table_is_widened_on_save() {
    let context = context();
    let store = context.database("robomodel").unwrap();
    store
        .execute(
            "CREATE TABLE TestModel (string_field TEXT, _id integer primary key autoincrement);
             INSERT INTO TestModel (string_field) VALUES ('old');",
        )
        .unwrap();

    let models = Manager::<TestModel>::new(&context);
    let mut record = models.create_with(TestModel::sample());
    record.save().unwrap();
    assert_eq!(record.id(), 2);

    let columns: Vec<String> = store
        .table_columns("TestModel")
        .unwrap()
        .into_iter()
        .map(|column| column.name)
        .collect();
    assert_eq!(columns[0], "string_field");
    assert_eq!(columns[1], "_id");
    assert_eq!(columns.len(), 2 + 12);

    let old = models.find(1).unwrap();
    assert_eq!(old.string_field, "old");
    assert_eq!(old.int_field, 0);
    assert!(!old.boolean_field);
    assert_eq!(old.answer, Answer::Life);
    assert_eq!(old.maybe_answer, None);
    assert!(old.tags.is_empty());
    assert_eq!(old.note, None);
}

#[test]
fn test_reload_repairs_missing_column() {
    let context = context();
    let store = context.database("robomodel").unwrap();
    store
        .execute(
            "CREATE TABLE TestModel (string_field TEXT, _id integer primary key autoincrement);
             INSERT INTO TestModel (string_field) VALUES ('old');",
        )
        .unwrap();

    let found = Manager::<TestModel>::new(&context).find(1).unwrap();
    assert_eq!(found.string_field, "old");
    assert!(store
        .table_columns("TestModel")
        .unwrap()
        .iter()
        .any(|column| column.name == "double_field" && column.declared_type == "REAL"));
}

#[test]
fn test_numbers_load_back_from_text_columns() {
    let context = context();
    context
        .database("robomodel")
        .unwrap()
        .execute("CREATE TABLE TestModel (int_field TEXT, boolean_field TEXT, _id integer primary key autoincrement);")
        .unwrap();

    let models = Manager::<TestModel>::new(&context);
    let mut record = models.create_with(TestModel::sample());
    record.save().unwrap();

    let found = models.find(record.id()).unwrap();
    assert_eq!(found.int_field, 42);
    assert!(found.boolean_field);
    assert_eq!(found.value(), &TestModel::sample());
}

#[test]
fn test_unmatched_enum_name_decodes_to_default() {
    let context = context();
    let models = Manager::<TestModel>::new(&context);
    let mut record = models.create_with(TestModel::sample());
    record.save().unwrap();

    context
        .database("robomodel")
        .unwrap()
        .execute("UPDATE TestModel SET answer = 'Nope', maybe_answer = ''")
        .unwrap();

    let found = models.find(record.id()).unwrap();
    assert_eq!(found.answer, Answer::Life);
    assert_eq!(found.maybe_answer, None);
}

#[test]
fn test_enum_stored_by_name() {
    let context = context();
    let models = Manager::<TestModel>::new(&context);
    let mut record = models.create_with(TestModel::sample());
    record.save().unwrap();

    let rows = context
        .database("robomodel")
        .unwrap()
        .query("TestModel", Some(&["answer", "maybe_answer"][..]), &Query::all())
        .unwrap();
    assert_eq!(rows[0].get("answer"), Some(&Value::Text("Universe".to_string())));
    assert_eq!(rows[0].get("maybe_answer"), Some(&Value::Text("everything".to_string())));
}

#[test]
fn test_absent_enum_is_omitted() {
    let context = context();
    let models = Manager::<TestModel>::new(&context);
    let mut value = TestModel::sample();
    value.maybe_answer = None;
    value.note = None;

    let mut record = models.create_with(value);
    record.save().unwrap();

    let rows = context
        .database("robomodel")
        .unwrap()
        .query("TestModel", None, &Query::all())
        .unwrap();
    assert_eq!(rows[0].get("maybe_answer"), Some(&Value::Null));
    assert_eq!(rows[0].get("note"), Some(&Value::Null));
    assert_eq!(models.find(record.id()).unwrap().maybe_answer, None);
}

#[test]
fn test_bad_json_names_the_field() {
    let context = context();
    let models = Manager::<TestModel>::new(&context);
    let mut record = models.create_with(TestModel::sample());
    record.save().unwrap();

    context
        .database("robomodel")
        .unwrap()
        .execute("UPDATE TestModel SET tags = '[oops'")
        .unwrap();

    match models.find(record.id()) {
        Err(Error::Codec {
            field,
            declared_type,
            ..
        }) => {
            assert_eq!(field, "tags");
            assert!(declared_type.contains("Vec"), "declared type was {declared_type}");
        }
        other => panic!("expected a codec error, got {other:?}"),
    }
}

#[test]
fn test_whitelist_mode_only_saves_marked_fields() {
    let schema = Whitelisted::schema().unwrap();
    let columns: Vec<&str> = schema.column_names().collect();
    assert_eq!(columns, vec!["kept", "renamed"]);
    assert_eq!(schema.table(), "whitelisted");

    let context = context();
    let models = Manager::<Whitelisted>::new(&context);
    let mut record = models.create();
    record.kept = "yes".to_string();
    record.dropped = "no".to_string();
    record.set_original(5);
    record.save().unwrap();

    let found = models.find(record.id()).unwrap();
    assert_eq!(found.kept, "yes");
    assert_eq!(found.dropped, "");
    assert_eq!(found.original(), 5);
}

#[test]
fn test_record_type_can_pick_its_database() {
    let context = context();
    let mut record = Manager::<Elsewhere>::new(&context).create();
    record.label = "far".to_string();
    record.save().unwrap();

    assert_eq!(record.database_name().unwrap(), "elsewhere");
    assert_eq!(
        context.database("elsewhere").unwrap().table_names().unwrap(),
        vec!["Elsewhere".to_string()]
    );
    assert!(context.database("robomodel").unwrap().table_names().unwrap().is_empty());
}

#[test]
fn test_malformed_record_types_are_configuration_errors() {
    let context = context();

    let mut clashing = Manager::<Clashing>::new(&context).create();
    assert!(matches!(clashing.save(), Err(Error::Configuration(_))));
    assert!(matches!(Clashing::schema(), Err(Error::Configuration(_))));

    let duplicated = Manager::<Duplicated>::new(&context);
    assert!(matches!(duplicated.count(), Err(Error::Configuration(_))));

    let mut keyworded = Manager::<Keyworded>::new(&context).create();
    assert!(matches!(keyworded.save(), Err(Error::Configuration(_))));
    assert!(context.database("robomodel").unwrap().table_names().unwrap().is_empty());
}

#[test]
fn test_to_json_serializes_value() {
    let context = context();
    let record = Manager::<TestModel>::new(&context).create_with(TestModel::sample());
    let json: serde_json::Value = serde_json::from_str(&record.to_json().unwrap()).unwrap();
    assert_eq!(json["string_field"], "Tapioca");
    assert_eq!(json["answer"], "Universe");
}
