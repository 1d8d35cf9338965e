use stepwise_core::{FolderPath, RequestTemplate, Step};

fn nested_step() -> Step {
    Step::new("3.1.2", "create order", RequestTemplate::new("POST", "https://api.test/orders"))
        .with_folder(FolderPath::new(["setup", "orders", "v2"]))
}

#[test]
fn display_name_includes_index_method_and_path() {
    let step = nested_step();
    assert_eq!(step.display_path(), "setup|>orders|>v2<|||create order|||>");
    assert_eq!(step.display_name(), "3.1.2 ### POST ~~> setup|>orders|>v2<|||create order|||>");
    assert_eq!(step.to_string(), step.display_name());
}

#[test]
fn name_matches_plain_display_and_suffix_forms() {
    let step = nested_step();
    assert!(step.name_matches("create order"));
    assert!(step.name_matches(&step.display_name()));
    assert!(step.name_matches("v2<|||create order"));
    assert!(step.name_matches("orders|>v2<|||create order"));
    assert!(!step.name_matches("setup<|||create order"));
    assert!(!step.name_matches("create"));
}

#[test]
fn in_folder_matches_contiguous_subpaths_only() {
    let step = nested_step();
    assert!(step.in_folder("orders"));
    assert!(step.in_folder("setup|>orders"));
    assert!(step.in_folder("|>orders|>v2|>"));
    assert!(!step.in_folder("setup|>v2"));
    assert!(!step.in_folder(""));
}

#[test]
fn root_steps_match_blank_folder() {
    let step = Step::new("1", "ping", RequestTemplate::new("GET", "https://api.test/ping"));
    assert!(step.is_in_root());
    assert!(step.in_folder(""));
    assert_eq!(step.display_name(), "1 ### GET ~~> ping");
}
