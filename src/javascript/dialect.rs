//! JavaScript code emission
//!
//! @module javascript/dialect

use crate::instrument::Dialect;
use crate::semantic::{Symbol, SymbolKind};
use crate::wire::SENTINEL;

/// Emits `console.log`-based dump calls
///
/// The prelude defines two helpers on a single line:
/// - `__stepwise_emit(value)` serializes a value and prints it between
///   sentinels. Only an object that is its own ancestor becomes
///   `"[Circular]"`; shared references serialize in full. `Map` and `Set`
///   become `{"[Map]": entries}` / `{"[Set]": values}`, non-finite numbers
///   become strings.
/// - `__stepwise_state(template, thunks)` fills variable values from thunks;
///   a thunk that throws (temporal dead zone, getter error) yields
///   `"<unavailable>"`
#[derive(Debug, Clone, Copy, Default)]
pub struct JavaScriptDialect;

const EMIT_FN: &str = "__stepwise_emit";
const STATE_FN: &str = "__stepwise_state";

impl Dialect for JavaScriptDialect {
    fn prelude(&self) -> String {
        format!(
            concat!(
                "function {emit}(v){{var a=[];var t;try{{t=JSON.stringify(v,function(k,x){{",
                "if(a.length>0){{var i=a.indexOf(this);if(i>=0)a.length=i+1;else a.push(this);",
                "if(x!==null&&typeof x===\"object\"&&a.indexOf(x)>=0)return \"[Circular]\";}}else a.push(x);",
                "if(typeof x===\"bigint\")return x.toString();",
                "if(typeof x===\"number\"&&!isFinite(x))return String(x);",
                "if(typeof x===\"function\")return \"[Function \"+(x.name||\"anonymous\")+\"]\";",
                "if(typeof x===\"symbol\")return x.toString();",
                "if(x===undefined)return \"undefined\";",
                "if(x instanceof Map){{a.push(x);return {{\"[Map]\":Array.from(x)}};}}",
                "if(x instanceof Set){{a.push(x);return {{\"[Set]\":Array.from(x)}};}}",
                "return x;}});}}catch(e){{t=JSON.stringify({{error:String(e)}});}}",
                "console.log(\"{sentinel}\"+\"\\n\"+t+\"\\n\"+\"{sentinel}\");}}",
                "function {state}(s,v){{var g=s.locals.concat(s.parameters,s.fields);",
                "for(var i=0;i<g.length;i++){{try{{g[i].value=v[i]();}}catch(e){{g[i].value=\"<unavailable>\";}}}}",
                "{emit}(s);}}",
            ),
            emit = EMIT_FN,
            state = STATE_FN,
            sentinel = SENTINEL,
        )
    }

    fn emit_payload(&self, json: &str) -> String {
        format!("{}({});", EMIT_FN, json)
    }

    fn emit_state(&self, template: &str, values: &[String]) -> String {
        format!("{}({}, [{}]);", STATE_FN, template, values.join(", "))
    }

    fn value_expression(&self, symbol: &Symbol) -> String {
        match (symbol.kind, &symbol.container) {
            (SymbolKind::Field, Some(class)) if symbol.is_static() => {
                format!("() => {}.{}", class, symbol.name)
            }
            (SymbolKind::Field, _) => format!("() => this.{}", symbol.name),
            _ => format!("() => {}", symbol.name),
        }
    }

    fn expression_body_open(&self, dump: &str) -> String {
        format!("{{ {} return (", dump)
    }

    fn expression_body_close(&self) -> String {
        "); }".to_string()
    }
}
