//! Statement compilation over derived records.

use tagorm::{
    BindMode, Cond, Orm, OrmConfig, OrmError, PageResult, Record, Resolver, Table, Value, values,
};

#[derive(Record)]
#[orm(table = "users")]
struct User {
    #[tag(json = "uid", db = "uid,pk")]
    uid: String,
    #[tag(json = "userName", db = "user_name")]
    name: String,
    #[tag(json = "age", db = "age")]
    age: i64,
    #[tag(json = "createdAt", db = "created_at")]
    created_at: String,
    #[orm(skip)]
    session: Option<String>,
}

#[derive(Record)]
struct Account {
    #[tag(db = "id,pk")]
    id: i64,
    #[tag(db = "owner")]
    owner: String,
    #[tag(db = "balance")]
    balance: f64,
}

#[derive(Record)]
struct Stamp {
    #[tag(db = "created_by")]
    created_by: String,
}

#[derive(Record)]
struct AuditLog {
    #[tag(db = "id,pk")]
    id: i64,
    #[orm(nested)]
    stamp: Stamp,
}

#[derive(Record)]
struct Plain {
    a: i32,
    b: String,
}

fn user() -> User {
    User {
        uid: "u1".into(),
        name: "alice".into(),
        age: 0,
        created_at: String::new(),
        session: Some("token".into()),
    }
}

fn literal() -> Orm {
    Orm::new(OrmConfig::new().bind_mode(BindMode::Literal))
}

#[test]
fn table_names_come_from_attribute_or_struct_name() {
    assert_eq!(user().table_name(), "users");
    let log = AuditLog {
        id: 1,
        stamp: Stamp {
            created_by: "ops".into(),
        },
    };
    assert_eq!(log.table_name(), "audit_log");
}

#[test]
fn column_map_marks_one_primary_key() {
    let account = Account {
        id: 7,
        owner: "alice".into(),
        balance: 1.5,
    };
    let (params, columns) = Resolver::default().resolve(&account);
    assert_eq!(columns.len(), 3);
    assert_eq!(columns.primary_key(), Some("id"));
    assert_eq!(columns.iter().filter(|(l, _)| Some(*l) != columns.primary_key()).count(), 2);
    assert_eq!(params.get("id"), Some(&Value::Int(7)));
}

#[test]
fn unannotated_record_has_no_columns() {
    let plain = Plain {
        a: 1,
        b: "x".into(),
    };
    let (_, columns) = Resolver::default().resolve(&plain);
    assert!(columns.is_empty());
    assert_eq!(columns.primary_key(), None);

    let (params, columns) = Resolver::default().resolve(&());
    assert!(params.is_empty() && columns.is_empty());
}

#[test]
fn nested_records_flatten_and_skipped_fields_vanish() {
    let log = AuditLog {
        id: 1,
        stamp: Stamp {
            created_by: "ops".into(),
        },
    };
    let (params, columns) = Resolver::default().resolve(&log);
    assert_eq!(columns.column("created_by"), Some("created_by"));
    assert_eq!(params.get("created_by"), Some(&Value::from("ops")));

    let (params, _) = Resolver::default().resolve(&user());
    assert!(!params.contains("session"));
}

#[test]
fn attaching_a_condition_twice_is_idempotent() {
    let orm = Orm::default();
    let u = user();
    let once = orm.select(&u).filter(Cond::and(["uid"])).build().unwrap();
    let twice = orm
        .select(&u)
        .filter(Cond::and(["uid"]))
        .filter(Cond::and(["uid"]))
        .build()
        .unwrap();
    assert_eq!(once.sql(), twice.sql());
}

#[test]
fn zero_filter_drops_empty_and_zero_fields() {
    let u = user();
    let filtered = literal()
        .select(&u)
        .filter(Cond::and_auto(["uid", "age", "createdAt"]))
        .build()
        .unwrap();
    assert_eq!(filtered.sql(), "SELECT * FROM \"users\" WHERE (uid='u1')");

    let kept = Orm::default()
        .select(&u)
        .filter(Cond::and(["uid", "age", "createdAt"]))
        .build()
        .unwrap();
    assert_eq!(
        kept.sql(),
        "SELECT * FROM \"users\" WHERE (uid=:uid AND age=:age AND created_at=:createdAt)"
    );
}

#[test]
fn multi_value_condition_adds_one_param_per_value() {
    let u = user();
    let stmt = Orm::default()
        .select(&u)
        .filter(Cond::or_values("userName", values!["a", "b", "c"]))
        .build()
        .unwrap();
    assert_eq!(
        stmt.sql(),
        "SELECT * FROM \"users\" WHERE (user_name=:userName1 OR user_name=:userName2 OR user_name=:userName3)"
    );
    let resolved = Resolver::default().resolve(&u).0;
    assert_eq!(stmt.params().len(), resolved.len() + 3);
}

#[test]
fn named_expression_binds_or_fails() {
    let u = user();
    let template = "created>=:a AND id=:b";

    let err = Orm::default()
        .select(&u)
        .filter(Cond::exp(template, values!["2024-01-01"]))
        .build()
        .unwrap_err();
    assert!(matches!(
        err,
        OrmError::ArgsMismatch {
            fields: 2,
            args: 1,
            ..
        }
    ));

    let stmt = Orm::default()
        .select(&u)
        .filter(Cond::exp(template, values!["2024-01-01", 5]))
        .build()
        .unwrap();
    assert_eq!(stmt.sql(), "SELECT * FROM \"users\" WHERE (created>=:a AND id=:b)");
    assert_eq!(stmt.params().get("a"), Some(&Value::from("2024-01-01")));
    assert_eq!(stmt.params().get("b"), Some(&Value::Int(5)));
}

#[test]
fn literal_expression_is_substituted_inline() {
    let u = user();
    let mut builder = literal().select(&u);
    builder.filter(Cond::exp("created>=:a AND id=:b", values!["2024-01-01", 5]));
    let stmt = builder.build().unwrap();
    assert_eq!(
        stmt.sql(),
        "SELECT * FROM \"users\" WHERE (created>='2024-01-01' AND id=5)"
    );
    assert_eq!(stmt.params(), builder.params());
}

#[test]
fn in_list_quotes_strings_only() {
    let u = user();
    let strings = Orm::default()
        .select(&u)
        .filter(Cond::in_list("userName", ["a", "b"]))
        .build()
        .unwrap();
    assert_eq!(strings.sql(), "SELECT * FROM \"users\" WHERE user_name IN ('a','b')");

    let ints = Orm::default()
        .select(&u)
        .filter(Cond::in_list("age", [1, 2]))
        .build()
        .unwrap();
    assert_eq!(ints.sql(), "SELECT * FROM \"users\" WHERE age IN (1,2)");
}

#[test]
fn primary_key_scopes_updates() {
    let u = user();
    let select = literal().select(&u).where_pk().build().unwrap();
    assert_eq!(select.sql(), "SELECT * FROM \"users\" WHERE (uid='u1')");

    let update = literal().update(&u).where_pk().build().unwrap();
    assert_eq!(
        update.sql(),
        "UPDATE \"users\" SET user_name='alice', age=0 WHERE (uid='u1')"
    );
}

#[test]
fn free_functions_use_default_config() {
    let u = user();
    let stmt = tagorm::delete(&u).where_pk().build().unwrap();
    assert_eq!(stmt.sql(), "DELETE FROM \"users\" WHERE (uid=:uid)");
    assert!(tagorm::delete(&u).build().is_err());
}

#[test]
fn raw_named_binds_record_fields() {
    let u = user();
    let stmt = Orm::default()
        .raw_named("SELECT * FROM users WHERE user_name = :userName", &u)
        .build()
        .unwrap();
    let (sql, values) = stmt.to_positional().unwrap();
    assert_eq!(sql, "SELECT * FROM users WHERE user_name = $1");
    assert_eq!(values, vec![Value::from("alice")]);

    let err = Orm::default().raw("").build().unwrap_err();
    assert!(matches!(err, OrmError::Validation(_)));
}

#[test]
fn pagination_offsets_and_page_count() {
    let u = user();
    let first = Orm::default().select(&u).page_sql(1, 10, &[]).unwrap();
    assert!(first.sql().contains("LIMIT 10 OFFSET 0)"));
    let third = Orm::default().select(&u).page_sql(3, 10, &[]).unwrap();
    assert!(third.sql().contains("LIMIT 10 OFFSET 20)"));

    let page = |total| PageResult::<()> {
        total,
        page_size: 10,
        ..Default::default()
    };
    assert_eq!(page(25).calc_total_page(), 3);
    assert_eq!(page(20).calc_total_page(), 2);
}
