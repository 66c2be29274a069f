//! Raw fact extraction from test sources.

pub mod dialect;
pub mod index;
mod java;
mod python;
pub mod vocab;
mod walker;

use std::path::PathBuf;
use std::sync::Arc;

use tracing::{debug, warn};

use crate::intent::{FileDiagnostic, RawFactModel};
use crate::syntax::{parse_file, ParsedSource};

pub use dialect::dialect_for;
pub use index::WorkspaceIndex;
pub use walker::{ExtractOptions, DEFAULT_MAX_EXPANSION_DEPTH, DYNAMIC};

use walker::Walker;

/// Extract raw facts for one feature. Without a workspace index, a local one
/// is built from the feature files themselves.
pub fn extract(
    feature_files: &[PathBuf],
    index: Option<&WorkspaceIndex>,
    options: &ExtractOptions,
) -> RawFactModel {
    let mut sources = Vec::new();
    let mut diagnostics = Vec::new();
    for path in feature_files {
        match parse_file(path) {
            Ok(parsed) => sources.push(Arc::new(parsed)),
            Err(err) => {
                warn!(path = %path.display(), error = %err, "skipping feature file");
                diagnostics.push(FileDiagnostic {
                    path: path.display().to_string(),
                    reason: err.to_string(),
                });
            }
        }
    }

    let mut facts = extract_sources(&sources, index, options);
    diagnostics.append(&mut facts.diagnostics);
    facts.diagnostics = diagnostics;
    facts
}

pub fn extract_sources(
    sources: &[Arc<ParsedSource>],
    index: Option<&WorkspaceIndex>,
    options: &ExtractOptions,
) -> RawFactModel {
    let local;
    let index = match index {
        Some(index) => index,
        None => {
            local = WorkspaceIndex::from_sources(sources.iter().cloned());
            &local
        }
    };

    let mut walker = Walker::new(index, options);
    for parsed in sources {
        walker.walk_source(parsed);
    }
    let facts = walker.finish();
    debug!(
        steps = facts.raw_steps.len(),
        assertions = facts.assertions.len(),
        locators = facts.locators.len(),
        hooks = facts.lifecycle_hooks.len(),
        "extraction finished"
    );
    facts
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::intent::{
        ActionKind, AssertOperator, ExpansionNoteKind, FlowScope, HookType, HttpMethod, Locator,
        LocatorStrategy,
    };
    use crate::syntax::SourceLanguage;

    fn java(path: &str, src: &str) -> Arc<ParsedSource> {
        Arc::new(ParsedSource::parse(path, SourceLanguage::Java, src).expect("parse java"))
    }

    fn python(path: &str, src: &str) -> Arc<ParsedSource> {
        Arc::new(ParsedSource::parse(path, SourceLanguage::Python, src).expect("parse python"))
    }

    fn run(feature: Arc<ParsedSource>, others: Vec<Arc<ParsedSource>>) -> RawFactModel {
        let mut all = others;
        all.push(feature.clone());
        let index = WorkspaceIndex::from_sources(all);
        extract_sources(&[feature], Some(&index), &ExtractOptions::default())
    }

    fn actions(facts: &RawFactModel) -> Vec<ActionKind> {
        facts.raw_steps.iter().map(|s| s.action).collect()
    }

    #[test]
    fn steps_follow_source_order() {
        let facts = extract_sources(
            &[java(
                "LoginTest.java",
                r#"
class LoginTest {
    @Test
    public void login() {
        driver.get("https://app.test/login");
        driver.findElement(By.id("u")).sendKeys("admin");
        Assert.assertEquals(a, b);
    }
}
"#,
            )],
            None,
            &ExtractOptions::default(),
        );

        assert_eq!(actions(&facts), vec![ActionKind::Navigate, ActionKind::Type]);
        assert_eq!(facts.raw_steps[0].url.as_deref(), Some("https://app.test/login"));
        assert_eq!(
            facts.raw_steps[1].locator,
            Some(Locator::new(LocatorStrategy::Id, "u"))
        );
        assert_eq!(facts.raw_steps[1].value.as_deref(), Some("admin"));
        assert_eq!(facts.assertions.len(), 1);
        assert_eq!(facts.assertions[0].operator, AssertOperator::Equals);
        assert_eq!(facts.assertions[0].left.as_deref(), Some("a"));
        assert_eq!(facts.assertions[0].right.as_deref(), Some("b"));
    }

    #[test]
    fn page_object_calls_expand_in_place_with_provenance() {
        let page = java(
            "LoginPage.java",
            r#"
public class LoginPage {
    private By userField = By.id("user");
    private By submitButton = By.cssSelector("button[type=submit]");
    private By forgotLink = By.linkText("Forgot?");
    public void login(String user) {
        type(userField, user);
        click(submitButton);
    }
}
"#,
        );
        let test = java(
            "LoginTest.java",
            r#"
class LoginTest {
    @Test
    public void signIn() {
        LoginPage lp = new LoginPage(driver);
        lp.login("x");
        Assert.assertTrue(lp.isLoggedIn());
    }
}
"#,
        );
        let facts = run(test, vec![page]);

        assert_eq!(actions(&facts), vec![ActionKind::Type, ActionKind::Click]);
        for step in &facts.raw_steps {
            assert_eq!(step.source_method.as_deref(), Some("LoginPage.login"));
        }
        assert_eq!(facts.raw_steps[0].value.as_deref(), Some(DYNAMIC));
        assert_eq!(facts.raw_steps[0].value_ref.as_deref(), Some("user"));

        let fields: Vec<_> = facts.locators.iter().map(|l| l.field_name.as_str()).collect();
        assert_eq!(fields, vec!["userField", "submitButton"]);
        assert!(facts.locators.iter().all(|l| l.class == "LoginPage"));
    }

    #[test]
    fn inherited_locators_resolve_to_the_declaring_class() {
        let base = java(
            "BasePage.java",
            r#"
public class BasePage {
    protected By spinner = By.className("spin");
}
"#,
        );
        let page = java(
            "CartPage.java",
            r#"
public class CartPage extends BasePage {
    public void open() { waitUntilElementIsVisible(spinner); }
}
"#,
        );
        let test = java(
            "CartTest.java",
            r#"
class CartTest {
    private CartPage cart;
    @Test
    public void opens() { cart.open(); }
}
"#,
        );
        let facts = run(test, vec![base, page]);
        assert_eq!(actions(&facts), vec![ActionKind::Wait]);
        assert_eq!(facts.raw_steps[0].source_method.as_deref(), Some("CartPage.open"));
        assert_eq!(facts.locators.len(), 1);
        assert_eq!(facts.locators[0].class, "BasePage");
        assert_eq!(facts.locators[0].file, "BasePage.java");
    }

    #[test]
    fn cycles_are_cut_and_recorded() {
        let page = java(
            "Loop.java",
            r#"
public class Loop {
    public void a() { click(By.id("a")); b(); }
    public void b() { a(); }
}
"#,
        );
        let test = java(
            "LoopTest.java",
            r#"
class LoopTest {
    @Test
    public void spins() { new Loop().a(); }
}
"#,
        );
        let facts = run(test, vec![page]);
        assert_eq!(actions(&facts), vec![ActionKind::Click]);
        assert_eq!(facts.expansion_notes.len(), 1);
        assert_eq!(facts.expansion_notes[0].kind, ExpansionNoteKind::Cycle);
        assert_eq!(facts.expansion_notes[0].target, "Loop.a");
        assert_eq!(facts.expansion_notes[0].via.as_deref(), Some("Loop.b"));
    }

    #[test]
    fn depth_cap_stops_deep_chains() {
        let page = java(
            "Deep.java",
            r#"
public class Deep {
    public void l1() { l2(); }
    public void l2() { l3(); }
    public void l3() { click(By.id("deep")); }
}
"#,
        );
        let test = java(
            "DeepTest.java",
            r#"
class DeepTest {
    @Test
    public void dives() { new Deep().l1(); }
}
"#,
        );
        let index = WorkspaceIndex::from_sources(vec![page, test.clone()]);
        let facts = extract_sources(&[test], Some(&index), &ExtractOptions { max_depth: 2 });
        assert!(facts.raw_steps.is_empty());
        assert_eq!(facts.expansion_notes.len(), 1);
        assert_eq!(facts.expansion_notes[0].kind, ExpansionNoteKind::DepthLimit);
        assert_eq!(facts.expansion_notes[0].target, "Deep.l3");
    }

    #[test]
    fn fluent_request_builders_attach_to_the_terminal_verb() {
        let facts = extract_sources(
            &[java(
                "ApiTest.java",
                r#"
class ApiTest {
    @Test
    public void createsUser() {
        given().header("Content-Type", "application/json").body(payload)
            .when().post("/users")
            .then().statusCode(201);
        given().when().get("/users/1");
    }
}
"#,
            )],
            None,
            &ExtractOptions::default(),
        );
        assert_eq!(facts.raw_steps.len(), 2);
        let create = &facts.raw_steps[0];
        assert_eq!(create.action, ActionKind::HttpRequest);
        assert_eq!(create.method, Some(HttpMethod::Post));
        assert_eq!(create.endpoint.as_deref(), Some("/users"));
        assert_eq!(create.payload.as_deref(), Some("payload"));
        assert_eq!(create.headers, vec!["\"Content-Type\", \"application/json\""]);

        let read = &facts.raw_steps[1];
        assert_eq!(read.method, Some(HttpMethod::Get));
        assert!(read.payload.is_none());
        assert!(read.headers.is_empty());
    }

    #[test]
    fn control_flow_is_recorded_once_per_top_level_construct() {
        let facts = extract_sources(
            &[java(
                "FlowTest.java",
                r#"
class FlowTest {
    @Test
    public void flows() {
        if (featureOn) {
            for (String u : users) {
                driver.findElement(By.id(u)).click();
            }
        }
    }
}
"#,
            )],
            None,
            &ExtractOptions::default(),
        );
        assert_eq!(facts.control_flow.len(), 1);
        assert_eq!(facts.control_flow[0].condition, "featureOn");
        assert_eq!(facts.control_flow[0].scope, FlowScope::Test);
        assert_eq!(facts.control_flow[0].line, 5);
        assert_eq!(actions(&facts), vec![ActionKind::Click]);
    }

    #[test]
    fn lifecycle_hooks_include_parent_classes() {
        let base = java(
            "BaseTest.java",
            r#"
public class BaseTest {
    @BeforeMethod
    public void setUp() { driver = new ChromeDriver(); }
    @AfterSuite
    public void tearDownAll() { driver.quit(); }
}
"#,
        );
        let test = java(
            "SearchTest.java",
            r#"
class SearchTest extends BaseTest {
    @BeforeClass
    public void loadData() { data = load(); }
    @Test
    public void searches() { driver.get("https://s"); }
}
"#,
        );
        let facts = run(test, vec![base]);
        let hooks: Vec<_> = facts
            .lifecycle_hooks
            .iter()
            .map(|h| (h.hook_type, h.action.as_str()))
            .collect();
        assert_eq!(
            hooks,
            vec![
                (HookType::BeforeClass, "loadData"),
                (HookType::BeforeEach, "driver_init"),
                (HookType::AfterSuite, "browser_close"),
            ]
        );
        assert_eq!(facts.lifecycle_hooks[1].file, "BaseTest.java");
    }

    #[test]
    fn python_tests_use_the_same_walker() {
        let page = python(
            "login_page.py",
            r#"
class LoginPage(BasePage):
    USERNAME = (By.ID, "user")
    SUBMIT = (By.CSS_SELECTOR, ".go")

    def login(self, name):
        self.driver.find_element(*self.USERNAME).send_keys(name)
        self.click_element(self.SUBMIT)
"#,
        );
        let test = python(
            "test_login.py",
            r#"
class TestLogin(unittest.TestCase):
    def setUp(self):
        self.driver = webdriver.Chrome()
        self.login_page = LoginPage(self.driver)

    def test_login(self):
        self.driver.get(self.base_url)
        self.login_page.login("admin")
        self.assertEqual(self.driver.title, "Home")
        assert self.login_page.is_logged_in()
        response = requests.post("/api/audit", json={"user": "admin"}, headers=auth)
"#,
        );
        let facts = run(test, vec![page]);

        assert_eq!(
            actions(&facts),
            vec![
                ActionKind::Navigate,
                ActionKind::Type,
                ActionKind::Click,
                ActionKind::HttpRequest
            ]
        );
        assert_eq!(facts.raw_steps[0].url.as_deref(), Some(DYNAMIC));
        assert_eq!(facts.raw_steps[0].url_ref.as_deref(), Some("self.base_url"));
        assert_eq!(facts.raw_steps[1].source_method.as_deref(), Some("LoginPage.login"));
        let request = &facts.raw_steps[3];
        assert_eq!(request.method, Some(HttpMethod::Post));
        assert_eq!(request.endpoint.as_deref(), Some("/api/audit"));
        assert_eq!(request.payload.as_deref(), Some("{\"user\": \"admin\"}"));
        assert_eq!(request.headers, vec!["auth"]);

        let operators: Vec<_> = facts.assertions.iter().map(|a| a.operator).collect();
        assert_eq!(operators, vec![AssertOperator::Equals, AssertOperator::True]);
        assert_eq!(facts.locators.len(), 2);
        assert_eq!(facts.lifecycle_hooks.len(), 1);
    }

    #[test]
    fn response_lookups_are_not_requests() {
        let facts = extract_sources(
            &[python(
                "test_users.py",
                r#"
def test_create_user(session, client):
    response = session.post("/users", json={"name": "ada"})
    user_id = response.json().get("id")
    token = response.headers.get("X-Token")
    name = client.get("/users/1").json().get("name")
    assert user_id
"#,
            )],
            None,
            &ExtractOptions::default(),
        );
        let requests: Vec<_> = facts
            .raw_steps
            .iter()
            .map(|s| (s.action, s.method, s.endpoint.as_deref()))
            .collect();
        assert_eq!(
            requests,
            vec![
                (ActionKind::HttpRequest, Some(HttpMethod::Post), Some("/users")),
                (ActionKind::HttpRequest, Some(HttpMethod::Get), Some("/users/1")),
            ]
        );
    }

    #[test]
    fn rest_assured_json_path_reads_are_not_requests() {
        let facts = extract_sources(
            &[java(
                "OrderApiTest.java",
                r#"
class OrderApiTest {
    @Test
    public void readsOrder() {
        Response response = RestAssured.given().get("/orders/7");
        String id = response.jsonPath().get("id");
    }
}
"#,
            )],
            None,
            &ExtractOptions::default(),
        );
        assert_eq!(facts.raw_steps.len(), 1);
        assert_eq!(facts.raw_steps[0].endpoint.as_deref(), Some("/orders/7"));
    }

    #[test]
    fn actions_in_control_flow_headers_are_steps() {
        let facts = extract_sources(
            &[python(
                "test_health.py",
                r#"
def test_health(client, driver):
    with client.get("/health") as r:
        assert r.status_code == 200
    while not driver.find_element(By.ID, "x").is_displayed():
        driver.refresh()
    if driver.find_element(By.ID, "ok").click():
        pass
"#,
            )],
            None,
            &ExtractOptions::default(),
        );
        assert_eq!(
            actions(&facts),
            vec![
                ActionKind::HttpRequest,
                ActionKind::IsDisplayed,
                ActionKind::Refresh,
                ActionKind::Click,
            ]
        );
        assert_eq!(facts.raw_steps[0].endpoint.as_deref(), Some("/health"));
        assert_eq!(
            facts.raw_steps[3].locator,
            Some(Locator::new(LocatorStrategy::Id, "ok"))
        );
        assert_eq!(facts.control_flow.len(), 3);
        assert_eq!(facts.assertions.len(), 1);
    }

    #[test]
    fn try_with_resources_requests_come_before_the_body() {
        let facts = extract_sources(
            &[java(
                "ExportTest.java",
                r#"
class ExportTest {
    @Test
    public void exports() {
        try (InputStream in = given().when().get("/export").asInputStream()) {
            driver.findElement(By.id("done")).click();
        }
    }
}
"#,
            )],
            None,
            &ExtractOptions::default(),
        );
        assert_eq!(actions(&facts), vec![ActionKind::HttpRequest, ActionKind::Click]);
        assert_eq!(facts.raw_steps[0].endpoint.as_deref(), Some("/export"));
    }

    #[test]
    fn unreadable_feature_files_become_diagnostics() {
        let facts = extract(
            &[PathBuf::from("/no/such/Feature.java")],
            None,
            &ExtractOptions::default(),
        );
        assert!(facts.raw_steps.is_empty());
        assert_eq!(facts.diagnostics.len(), 1);
    }
}
