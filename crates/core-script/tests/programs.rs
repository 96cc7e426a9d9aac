use core_config::IndentConfig;
use core_script::{Bindings, Locals, ScriptError, Snip, Value, evaluate, parse_expression, parse_program, run};
use pretty_assertions::assert_eq;

struct Tabs(Vec<&'static str>);

impl Bindings for Tabs {
    fn tabstop(&self, id: u32) -> Option<String> {
        self.0.get(id as usize).map(|s| s.to_string())
    }

    fn call(&self, name: &str, _args: &[Value]) -> Option<Value> {
        (name == "indent").then_some(Value::Int(4))
    }
}

fn exec(src: &str, tabs: &Tabs, locals: &mut Locals) -> Result<String, ScriptError> {
    let program = parse_program(src)?;
    run(&program, tabs, Snip::new(0, IndentConfig::default()), locals)
}

#[test]
fn branches_pick_the_result() {
    let src = "a = 1\nb = 2\nif b > a {\n    snip.rv = \"b isbigger a\"\n} else {\n    snip.rv = \"a isbigger b\"\n}";
    let out = exec(src, &Tabs(vec![]), &mut Locals::new()).unwrap();
    assert_eq!(out, "b isbigger a");
}

#[test]
fn tabstop_text_drives_output() {
    let tabs = Tabs(vec!["", "hallo", ""]);
    let src = "if t[2] == \"\" { snip.rv = t[1].upper() + \"!\" } else { snip.rv = t[2] }";
    assert_eq!(exec(src, &tabs, &mut Locals::new()).unwrap(), "HALLO!");
    assert_eq!(
        exec("snip.rv = str(len(t[1])) + t[1][0]", &tabs, &mut Locals::new()).unwrap(),
        "5h"
    );
}

#[test]
fn locals_survive_between_programs() {
    let tabs = Tabs(vec![]);
    let mut locals = Locals::new();
    exec("snip.locals[\"count\"] = 41", &tabs, &mut locals).unwrap();
    let out = exec("snip.rv = snip.locals[\"count\"] + 1", &tabs, &mut locals).unwrap();
    assert_eq!(out, "42");
}

#[test]
fn host_functions_and_unknown_names() {
    let tabs = Tabs(vec![]);
    let expr = parse_expression("indent(\".\") * 2").unwrap();
    assert_eq!(evaluate(&expr, &tabs).unwrap(), Value::Int(8));
    let expr = parse_expression("nowhere(1)").unwrap();
    assert!(matches!(evaluate(&expr, &tabs), Err(ScriptError::UnknownFunction(_))));
    assert!(matches!(
        exec("snip.rv = ghost", &tabs, &mut Locals::new()),
        Err(ScriptError::UnknownVariable(_))
    ));
}
