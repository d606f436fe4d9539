use std::sync::Mutex;

use chrono::NaiveDate;

use crate::controller::{
    Controller, ControllerOptions, Mutation, MutationError, Notice, RefreshOutcome,
};
use crate::gateway::{Gateway, GatewayError, GENERIC_ERROR_MESSAGE};
use crate::model::{Field, Product, ProductDraft, ProductId, ProductPayload};
use crate::pipeline::SortDirection;
use crate::shell::Shell;

#[derive(Default)]
struct MemoryGateway {
    products: Mutex<Vec<Product>>,
    calls: Mutex<Vec<String>>,
    next_failure: Mutex<Option<GatewayError>>,
    list_failure: Mutex<Option<GatewayError>>,
}

impl MemoryGateway {
    fn with(products: Vec<Product>) -> Self {
        Self {
            products: Mutex::new(products),
            ..Self::default()
        }
    }

    fn fail_next(&self, status: u16, message: Option<&str>) {
        *self.next_failure.lock().unwrap() = Some(GatewayError::Status {
            url: "memory://product".to_string(),
            status,
            message: message.map(str::to_string),
        });
    }

    fn fail_next_list(&self, status: u16) {
        *self.list_failure.lock().unwrap() = Some(GatewayError::Status {
            url: "memory://product".to_string(),
            status,
            message: None,
        });
    }

    fn record(&self, call: String) -> Result<(), GatewayError> {
        self.calls.lock().unwrap().push(call);
        match self.next_failure.lock().unwrap().take() {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }

    fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    fn count(&self, prefix: &str) -> usize {
        self.calls().iter().filter(|c| c.starts_with(prefix)).count()
    }

    fn apply(product: &mut Product, payload: &ProductPayload) {
        product.name = payload.name.clone();
        product.stock = payload.stock;
        product.sold = payload.sold;
        product.date = payload.date;
        product.category = payload.category.clone();
    }
}

impl Gateway for MemoryGateway {
    async fn list(&self) -> Result<Vec<Product>, GatewayError> {
        self.calls.lock().unwrap().push("list".to_string());
        if let Some(e) = self.list_failure.lock().unwrap().take() {
            return Err(e);
        }
        Ok(self.products.lock().unwrap().clone())
    }

    async fn create(&self, payload: &ProductPayload) -> Result<(), GatewayError> {
        self.record(format!("create {}", payload.name))?;
        let mut products = self.products.lock().unwrap();
        let next = products
            .iter()
            .filter_map(|p| match p.id {
                ProductId::Int(v) => Some(v),
                ProductId::Text(_) => None,
            })
            .max()
            .unwrap_or(0)
            + 1;
        let mut product = product(next, "", 0, "");
        Self::apply(&mut product, payload);
        products.push(product);
        Ok(())
    }

    async fn update(&self, id: &ProductId, payload: &ProductPayload) -> Result<(), GatewayError> {
        self.record(format!("update {id}"))?;
        let mut products = self.products.lock().unwrap();
        match products.iter_mut().find(|p| &p.id == id) {
            Some(p) => {
                Self::apply(p, payload);
                Ok(())
            }
            None => Err(GatewayError::Status {
                url: format!("memory://product/{id}"),
                status: 404,
                message: Some("Product not found".to_string()),
            }),
        }
    }

    async fn delete(&self, id: &ProductId) -> Result<(), GatewayError> {
        self.record(format!("delete {id}"))?;
        self.products.lock().unwrap().retain(|p| &p.id != id);
        Ok(())
    }
}

fn product(id: i64, name: &str, stock: u64, category: &str) -> Product {
    Product {
        id: ProductId::Int(id),
        name: name.to_string(),
        stock,
        sold: 0,
        date: NaiveDate::from_ymd_opt(2023, 8, 17).unwrap(),
        category: category.to_string(),
    }
}

fn numbered(n: i64) -> Vec<Product> {
    (1..=n)
        .map(|i| product(i, &format!("Barang {i:02}"), i as u64, "Umum"))
        .collect()
}

fn ids(controller: &Controller<MemoryGateway>) -> Vec<ProductId> {
    controller
        .page()
        .rows
        .iter()
        .map(|p| p.id.clone())
        .collect()
}

async fn loaded(products: Vec<Product>) -> Controller<MemoryGateway> {
    let mut controller = Controller::new(
        MemoryGateway::with(products),
        ControllerOptions::default(),
    );
    assert!(matches!(
        controller.refresh().await,
        RefreshOutcome::Applied { .. }
    ));
    controller
}

fn fill_form(controller: &mut Controller<MemoryGateway>, values: [&str; 5]) {
    for (field, value) in Field::ALL.into_iter().zip(values) {
        controller.set_draft_field(field, value).unwrap();
    }
}

#[tokio::test]
async fn search_finds_only_the_mouse() {
    let mut controller = loaded(vec![
        product(1, "Keyboard", 10, "Aksesoris"),
        product(2, "Mouse", 0, "Aksesoris"),
    ])
    .await;
    controller.set_search("mouse");
    assert_eq!(ids(&controller), vec![ProductId::Int(2)]);
}

#[tokio::test]
async fn stock_header_sorts_ascending_then_descending() {
    let mut controller = loaded(vec![
        product(1, "Keyboard", 10, "Aksesoris"),
        product(2, "Mouse", 0, "Aksesoris"),
        product(3, "Monitor", 4, "Layar"),
    ])
    .await;

    controller.click_header(Field::Stock);
    let sort = controller.state().view.sort.unwrap();
    assert_eq!(sort.direction, SortDirection::Ascending);
    assert_eq!(
        ids(&controller),
        vec![ProductId::Int(2), ProductId::Int(3), ProductId::Int(1)]
    );

    controller.click_header(Field::Stock);
    assert_eq!(
        controller.state().view.sort.unwrap().direction,
        SortDirection::Descending
    );
    assert_eq!(
        ids(&controller),
        vec![ProductId::Int(1), ProductId::Int(3), ProductId::Int(2)]
    );
}

#[tokio::test]
async fn add_with_missing_category_sends_nothing() {
    let mut controller = loaded(vec![product(1, "Keyboard", 10, "Aksesoris")]).await;
    let before = controller.state().products.clone();

    controller.open_create();
    fill_form(&mut controller, ["Mouse", "3", "1", "2024-01-05", ""]);
    let err = controller.submit().await.unwrap_err();

    assert!(matches!(err, MutationError::Validation(_)));
    assert_eq!(controller.gateway().count("create"), 0);
    assert_eq!(controller.state().products, before);
    assert!(controller.state().modal.open);
    let notices = controller.take_notices();
    assert!(matches!(&notices[..], [Notice::Error(msg)] if msg.contains("Jenis Barang")));
}

#[tokio::test]
async fn confirmed_delete_disappears_after_refresh() {
    let mut controller = loaded(vec![
        product(1, "Keyboard", 10, "Aksesoris"),
        product(2, "Mouse", 0, "Aksesoris"),
    ])
    .await;

    let declined = controller
        .delete(&ProductId::Int(2), |_| false)
        .await
        .unwrap();
    assert_eq!(declined, Mutation::Declined);
    assert_eq!(controller.gateway().count("delete"), 0);

    let mut asked_about = None;
    let done = controller
        .delete(&ProductId::Int(2), |p| {
            asked_about = Some(p.name.clone());
            true
        })
        .await
        .unwrap();
    assert_eq!(done, Mutation::Deleted);
    assert_eq!(asked_about.as_deref(), Some("Mouse"));
    assert_eq!(ids(&controller), vec![ProductId::Int(1)]);
    assert_eq!(
        controller.gateway().calls(),
        vec!["list", "delete 2", "list"]
    );
}

#[tokio::test]
async fn twelve_rows_make_three_pages() {
    let mut controller = loaded(numbered(12)).await;
    assert_eq!(controller.page().total_pages, 3);
    assert!(controller.goto_page(3));
    let page = controller.page();
    assert_eq!(page.rows.len(), 2);
    assert_eq!(page.display_range(), Some((11, 12)));
    assert!(!page.can_next());
    assert!(!controller.next_page());
    assert!(!controller.goto_page(4));
}

#[tokio::test]
async fn refetching_unchanged_data_gives_the_same_view() {
    let mut controller = loaded(numbered(8)).await;
    controller.set_search("barang");
    controller.click_header(Field::Name);
    controller.click_header(Field::Name);
    assert!(controller.goto_page(2));
    let first = ids(&controller);

    controller.refresh().await;
    assert_eq!(ids(&controller), first);
    assert_eq!(controller.state().view.page, 2);
}

#[tokio::test]
async fn create_success_closes_form_and_reloads() {
    let mut controller = loaded(numbered(2)).await;
    controller.open_create();
    fill_form(&mut controller, ["Teh Botol", "24", "6", "2024-02-01", "Minuman"]);

    assert_eq!(controller.submit().await.unwrap(), Mutation::Created);
    assert!(!controller.state().modal.open);
    assert_eq!(controller.state().modal.draft, ProductDraft::default());
    assert_eq!(controller.state().products.len(), 3);
    assert_eq!(controller.state().products[2].name, "Teh Botol");
    assert_eq!(
        controller.take_notices(),
        vec![Notice::Success("Product added successfully.".to_string())]
    );
}

#[tokio::test]
async fn rejected_create_still_closes_and_refreshes() {
    let mut controller = loaded(numbered(2)).await;
    controller.open_create();
    fill_form(&mut controller, ["Teh", "1", "1", "2024-02-01", "Minuman"]);
    controller.gateway().fail_next(422, Some("Nama barang sudah ada"));

    let err = controller.submit().await.unwrap_err();
    assert!(matches!(err, MutationError::Gateway(_)));
    assert!(!controller.state().modal.open);
    assert_eq!(controller.gateway().count("list"), 2);
    assert_eq!(
        controller.take_notices(),
        vec![Notice::Error("Nama barang sudah ada".to_string())]
    );
}

#[tokio::test]
async fn rejected_mutation_can_skip_the_refresh() {
    let mut controller = Controller::new(
        MemoryGateway::with(numbered(2)),
        ControllerOptions {
            refresh_on_failure: false,
        },
    );
    controller.refresh().await;
    controller.gateway().fail_next(500, None);

    let err = controller
        .delete(&ProductId::Int(1), |_| true)
        .await
        .unwrap_err();
    assert!(matches!(err, MutationError::Gateway(_)));
    assert_eq!(controller.gateway().count("list"), 1);
    assert_eq!(
        controller.take_notices(),
        vec![Notice::Error(GENERIC_ERROR_MESSAGE.to_string())]
    );
}

#[tokio::test]
async fn editing_id_survives_a_failed_update_only() {
    let mut controller = loaded(numbered(3)).await;
    let id = ProductId::Int(2);

    controller.open_edit(&id).unwrap();
    assert_eq!(controller.state().modal.draft.name, "Barang 02");
    assert_eq!(controller.state().modal.mode().submit_label(), "Update");
    controller.set_draft_field(Field::Stock, "99").unwrap();
    controller.gateway().fail_next(500, None);
    assert!(controller.submit().await.is_err());
    assert!(!controller.state().modal.open);
    assert_eq!(controller.state().modal.editing, Some(id.clone()));

    controller.open_edit(&id).unwrap();
    controller.set_draft_field(Field::Stock, "99").unwrap();
    assert_eq!(controller.submit().await.unwrap(), Mutation::Updated);
    assert_eq!(controller.state().modal.editing, None);
    assert_eq!(controller.state().find(&id).unwrap().stock, 99);
    assert_eq!(controller.gateway().count("update 2"), 2);
}

#[tokio::test]
async fn opening_add_forgets_a_stale_edit() {
    let mut controller = loaded(numbered(1)).await;
    controller.open_edit(&ProductId::Int(1)).unwrap();
    controller.cancel_form();
    controller.open_create();
    assert_eq!(controller.state().modal.mode().submit_label(), "Save");
    assert!(controller.open_edit(&ProductId::Int(42)).is_err());
}

#[tokio::test]
async fn newest_issued_refresh_wins() {
    let mut controller = Controller::new(
        MemoryGateway::with(numbered(3)),
        ControllerOptions::default(),
    );
    let older = controller.begin_refresh();
    let newer = controller.begin_refresh();
    let (old_result, new_result) =
        futures::join!(controller.gateway().list(), controller.gateway().list());

    let mut shrunk = new_result.unwrap();
    shrunk.truncate(1);
    assert!(matches!(
        controller.finish_refresh(newer, Ok(shrunk)),
        RefreshOutcome::Applied { count: 1 }
    ));
    assert!(matches!(
        controller.finish_refresh(older, old_result),
        RefreshOutcome::Stale
    ));
    assert_eq!(controller.state().products.len(), 1);
}

#[tokio::test]
async fn failed_refresh_keeps_rows_and_later_refresh_applies() {
    let mut controller = loaded(numbered(3)).await;
    controller.gateway().products.lock().unwrap().truncate(1);

    controller.gateway().fail_next_list(503);
    assert!(matches!(
        controller.refresh().await,
        RefreshOutcome::Failed(GatewayError::Status { status: 503, .. })
    ));
    assert_eq!(controller.state().products.len(), 3);
    assert_eq!(
        controller.take_notices(),
        vec![Notice::Error(GENERIC_ERROR_MESSAGE.to_string())]
    );

    assert!(matches!(
        controller.refresh().await,
        RefreshOutcome::Applied { count: 1 }
    ));
    assert_eq!(ids(&controller), vec![ProductId::Int(1)]);
    assert!(controller.take_notices().is_empty());
}

#[tokio::test]
async fn page_is_clamped_when_the_list_shrinks() {
    let mut controller = loaded(numbered(11)).await;
    assert!(controller.goto_page(3));
    for id in 6..=11 {
        controller
            .delete(&ProductId::Int(id), |_| true)
            .await
            .unwrap();
    }
    assert_eq!(controller.state().view.page, 1);
    assert_eq!(controller.page().rows.len(), 5);
}

#[tokio::test]
async fn state_serializes_for_inspection() {
    let mut controller = loaded(numbered(1)).await;
    controller.click_header(Field::Date);
    let json = serde_json::to_value(controller.state()).unwrap();
    assert_eq!(json["view"]["sort"]["field"], "date");
    assert_eq!(json["view"]["sort"]["direction"], "ascending");
    assert_eq!(json["products"][0]["nama_barang"], "Barang 01");
    assert_eq!(json["modal"]["open"], false);
}

#[tokio::test]
async fn shell_session_adds_and_deletes() {
    let mut controller = Controller::new(
        MemoryGateway::with(vec![product(1, "Keyboard", 10, "Aksesoris")]),
        ControllerOptions::default(),
    );
    let script = "\
add
Kopi Susu
12
3

Minuman
y



2024-01-02

y
search kopi
delete 1
y
search
quit
";
    let mut out: Vec<u8> = Vec::new();
    {
        let mut shell = Shell::new(&mut controller, script.as_bytes(), &mut out, false);
        shell.refresh().await.unwrap();
        shell.run().await.unwrap();
    }
    let text = String::from_utf8_lossy(&out);
    assert!(text.contains("Product added successfully."));
    assert!(text.contains("Product deleted successfully."));
    assert!(text.contains("Tanggal Transaksi"));
    assert_eq!(
        controller.gateway().calls(),
        vec!["list", "create Kopi Susu", "list", "delete 2", "list"]
    );
    assert_eq!(ids(&controller), vec![ProductId::Int(1)]);
}
