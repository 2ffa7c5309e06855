//! Lambda signature synthesis (§4.6.1).
//!
//! `CallSiteRegistry` is an opaque, inter-procedural oracle this crate only
//! calls through — it is explicitly out of scope to implement (§1).

use gs_ast::LambdaId;

pub trait CallSiteRegistry: Send + Sync {
    fn argument_type_at(&self, lambda: LambdaId, param_index: usize) -> Option<String>;
}

/// The candidate sources for one lambda parameter's type, in priority order
/// (§4.6.1: declared > default value > merge of call-site and duck-typing,
/// call-site winning ties).
#[derive(Clone, Debug, Default)]
pub struct LambdaParamGuess {
    pub declared: Option<String>,
    pub default_value_type: Option<String>,
    pub call_site_type: Option<String>,
    pub duck_typed: Option<String>,
}

pub fn resolve_param_type(guess: &LambdaParamGuess) -> String {
    if let Some(declared) = &guess.declared {
        return declared.clone();
    }
    if let Some(default_ty) = &guess.default_value_type {
        return default_ty.clone();
    }
    match (&guess.call_site_type, &guess.duck_typed) {
        (Some(call_site), _) if call_site != "Variant" => call_site.clone(),
        (_, Some(duck)) if duck != "Variant" => duck.clone(),
        (Some(call_site), _) => call_site.clone(),
        (None, Some(duck)) => duck.clone(),
        (None, None) => "Variant".to_string(),
    }
}

/// `Callable[[P1,...,Pn], R]`, collapsing to the plain name `Callable` when
/// every parameter is `Variant` and the return is `void` (§4.6.1).
pub fn format_callable(params: &[String], ret: &str) -> String {
    if ret == "void" && params.iter().all(|p| p == "Variant") {
        return "Callable".to_string();
    }
    format!("Callable[[{}], {}]", params.join(","), ret)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn declared_type_wins_over_everything() {
        let guess = LambdaParamGuess {
            declared: Some("int".to_string()),
            call_site_type: Some("String".to_string()),
            ..Default::default()
        };
        assert_eq!(resolve_param_type(&guess), "int");
    }

    #[test]
    fn call_site_wins_ties_over_duck_typing() {
        let guess = LambdaParamGuess {
            call_site_type: Some("int".to_string()),
            duck_typed: Some("float".to_string()),
            ..Default::default()
        };
        assert_eq!(resolve_param_type(&guess), "int");
    }

    #[test]
    fn falls_back_to_variant_when_nothing_known() {
        assert_eq!(resolve_param_type(&LambdaParamGuess::default()), "Variant");
    }

    #[test]
    fn no_typed_params_and_void_return_collapses_to_plain_callable() {
        assert_eq!(format_callable(&["Variant".to_string()], "void"), "Callable");
    }

    #[test]
    fn typed_params_format_full_shape() {
        assert_eq!(format_callable(&["int".to_string()], "int"), "Callable[[int], int]");
    }
}
