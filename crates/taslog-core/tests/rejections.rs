//! Documents and call sequences outside the format must fail loudly.

use taslog_core::writer::LogWriter;
use taslog_core::{read_str, Collision, Damage};

/// A document exercising every scope, with `{X}` spliced into one place.
fn template(at: &str, extra: &str) -> String {
    let slot = |name: &str| if name == at { extra } else { "" };
    format!(
        concat!(
            r#"{{"tool_ver":"t","build":1,"mod":"m",{log}"pf":[{{"ft":0.01,"cbuf":"",{pf}"#,
            r#""cf":[{{"ms":1,{cf}"view":[{view}],"#,
            r#""prepm":{{{pre}"pos":[0,0,0]}},"postpm":{{{post}"og":true}},"#,
            r#""col":[{{{col}"ent":1,"n":[0,0,1],"d":0,"ivel":[0,0,0]}}]}}],"#,
            r#""dmg":[{{{dmg}"dmg":1,"bits":0}}],"#,
            r#""obj":[{{{obj}"vel":[0,0,0],"pos":[0,0,0]}}]}}]}}"#
        ),
        log = slot("log"),
        pf = slot("pf"),
        cf = slot("cf"),
        view = if at == "view" { extra } else { "0,0,0" },
        pre = slot("pre"),
        post = slot("post"),
        col = slot("col"),
        dmg = slot("dmg"),
        obj = slot("obj"),
    )
}

const SCOPES: [&str; 8] = ["log", "pf", "cf", "pre", "post", "col", "dmg", "obj"];

#[test]
fn template_is_valid_as_is() {
    for scope in SCOPES {
        read_str(&template(scope, "")).unwrap();
    }
}

#[test]
fn unknown_key_fails_in_every_scope() {
    for scope in SCOPES {
        let err = read_str(&template(scope, r#""zz":1,"#)).unwrap_err();
        let msg = format!("{err:#}");
        assert!(msg.contains("unknown key \"zz\""), "{scope}: {msg}");
    }
}

#[test]
fn null_fails_in_every_scope() {
    for scope in SCOPES {
        let key = match scope {
            "log" => "build",
            "pf" => "ft",
            "cf" => "hp",
            "pre" | "post" => "og",
            "col" => "d",
            "dmg" => "bits",
            _ => "pull",
        };
        let extra = format!(r#""{key}":null,"#);
        assert!(read_str(&template(scope, &extra)).is_err(), "{scope}");
    }
}

#[test]
fn vector_arity_other_than_three_fails() {
    assert!(read_str(&template("view", "1,2,3")).is_ok());
    for bad in ["", "1", "1,2", "1,2,3,4"] {
        assert!(read_str(&template("view", bad)).is_err(), "[{bad}]");
    }
    for bad in [r#""bvel":[1,2],"#, r#""vel":[1,2,3,4],"#] {
        assert!(read_str(&template("pre", bad)).is_err(), "{bad}");
    }
    assert!(read_str(&template("dmg", r#""dir":[1],"#)).is_err());
}

#[test]
fn nested_arrays_in_vectors_fail() {
    assert!(read_str(&template("view", "[1],2,3")).is_err());
}

#[test]
fn malformed_json_fails() {
    assert!(read_str("").is_err());
    assert!(read_str("{").is_err());
    assert!(read_str(r#"{"tool_ver":"t",}"#).is_err());
    assert!(read_str(&template("log", "")[1..]).is_err());
}

#[test]
fn writer_rejects_out_of_order_calls() {
    let mut w = LogWriter::new();
    assert!(w.set_health(100.0).is_err());
    assert!(w.end_log().is_err());

    w.start_log("t", 1, "m").unwrap();
    assert!(w.set_health(100.0).is_err());
    assert!(w.end_cmd_frame().is_err());
    assert!(w.push_collision(Collision::default()).is_err());

    w.start_physics_frame(0.01, 5, false, "").unwrap();
    assert!(w.start_physics_frame(0.01, 5, false, "").is_err());
    assert!(w.set_on_ground(true).is_err());

    w.start_cmd_frame(1, 1, 0.0).unwrap();
    assert!(w.start_cmd_frame(1, 1, 0.0).is_err());
    assert!(w.end_physics_frame().is_err());
    w.end_cmd_frame().unwrap();
    w.push_damage(Damage::default()).unwrap();
    w.end_physics_frame().unwrap();
    w.end_log().unwrap();
    assert!(w.is_complete());
}

#[test]
fn numbers_beyond_f32_range_fail_in_every_scope() {
    let cases = [
        ("pf", r#""ft":1e39,"#),
        ("cf", r#""hp":-1e39,"#),
        ("pre", r#""vel":[0,1e40,0],"#),
        ("col", r#""d":1e300,"#),
        ("dmg", r#""dmg":4e38,"#),
    ];
    for (scope, extra) in cases {
        let err = read_str(&template(scope, extra)).unwrap_err();
        let msg = format!("{err:#}");
        assert!(msg.contains("does not fit in f32"), "{scope}: {msg}");
    }
}
