use std::io::Write;
use std::path::Path;

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use rust_rental::actions::ActionSubmitter;
use rust_rental::api::Api;
use rust_rental::config::Config;
use rust_rental::error::AppError;
use rust_rental::http_client::ApiClient;
use rust_rental::models::{AuthUser, ItemDetail, QrTokenType, ReturnRequestStatus};
use rust_rental::qr::display::OrgQrMetaFetcher;
use rust_rental::qr::{resolve_scanned_text, start_qr_display, QrDisplayState, TokenValidator};
use rust_rental::scanner::{ScanSession, TerminalScanner};
use rust_rental::session::{
    RentFlow, RentSelection, ReturnEvidence, ReturnFlow, SessionMachine, SessionState,
};
use rust_rental::store::AuthStore;
use rust_rental::upload::UploadManager;

const USAGE: &str = "\
usage: rust-rental <command>

  rent [scanned-text]             QRから貸出フローを開始
  return <photo> [scanned-text]   QRから返却フローを開始（返却写真つき）
  qr-display                      組織QRを表示（50秒ごとに更新）
  returns                         返却申請の承認（管理者）
  upload <photo>...               備品登録用の写真をアップロード
  signup                          学生登録
  whoami                          ログイン中のユーザーを表示
  logout                          セッションを破棄
";

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "rust_rental=warn".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load configuration
    let config = Config::from_env().expect("Failed to load configuration (API_BASE_URL)");
    let client = ApiClient::new(&config);
    let api = Api::new(client);
    let auth = AuthStore::load(&config.session_file);

    let args: Vec<String> = std::env::args().skip(1).collect();
    let command = args.first().map(String::as_str).unwrap_or("help");

    match command {
        "rent" => run_rent_flow(&api, &auth, args.get(1).cloned()).await?,
        "return" => match args.get(1) {
            Some(photo) => {
                run_return_flow(&api, &auth, Path::new(photo), args.get(2).cloned()).await?
            }
            None => println!("{}", USAGE),
        },
        "qr-display" => run_qr_display(&api, &auth).await?,
        "returns" => run_admin_returns(&api, &auth).await?,
        "upload" => run_upload_grid(&api, &args[1..]).await?,
        "signup" => run_signup(&api, &auth).await?,
        "whoami" => match auth.current_user() {
            Some(user) => println!("{} ({})", user.name, user.id),
            None => println!("未ログインです"),
        },
        "logout" => {
            auth.sign_out()?;
            println!("セッションを破棄しました");
        }
        _ => println!("{}", USAGE),
    }

    Ok(())
}

/// Read the scanned QR payload: from the argument if given, otherwise
/// through a one-shot scan session on the terminal.
async fn read_scan(given: Option<String>) -> anyhow::Result<Option<String>> {
    if let Some(text) = given {
        return Ok(Some(text));
    }
    println!("QRコードの内容を貼り付けてください:");
    let mut session = ScanSession::new(TerminalScanner::new());
    Ok(session.scan().await?)
}

fn prompt(label: &str) -> anyhow::Result<String> {
    print!("{}: ", label);
    std::io::stdout().flush()?;
    let mut line = String::new();
    std::io::stdin().read_line(&mut line)?;
    Ok(line.trim().to_string())
}

fn require_user(auth: &AuthStore) -> anyhow::Result<AuthUser> {
    auth.current_user()
        .ok_or_else(|| anyhow::anyhow!("ログインしてください（signup）"))
}

async fn run_rent_flow(api: &Api, auth: &AuthStore, scanned: Option<String>) -> anyhow::Result<()> {
    let user = require_user(auth)?;
    let scanned = read_scan(scanned).await?;
    let token = scanned.as_deref().and_then(resolve_scanned_text);

    let validator = TokenValidator::new(api.qr.clone());
    let actions = ActionSubmitter::new(api.rentals.clone(), api.returns.clone());
    let machine = SessionMachine::new(RentFlow::new(
        validator,
        api.items.clone(),
        actions,
    ));

    match machine.start(token.as_deref(), &user).await {
        SessionState::ListReady => {}
        SessionState::ListEmpty => {
            println!("この組織で貸出できる備品はありません");
            return Ok(());
        }
        SessionState::TokenError(msg)
        | SessionState::Unauthorized(msg)
        | SessionState::ListError(msg) => {
            println!("{}", msg);
            return Ok(());
        }
        state => anyhow::bail!("unexpected state: {:?}", state),
    }

    let items = machine.entries();
    for (i, item) in items.iter().enumerate() {
        println!(
            "[{}] {} (残り {}/{}, 待機 {}人, デポジット {}円)",
            i,
            item.name,
            item.available_quantity,
            item.total_quantity,
            item.count_wait_list,
            item.deposit
        );
    }

    let index: usize = prompt("借りる備品の番号")?.parse()?;
    machine.select(index)?;
    let item = machine.selected().expect("selection was just made");

    if !item.is_rentable() {
        let answer = prompt("在庫がありません。ウェイトリストに並びますか? [y/N]")?;
        if answer.eq_ignore_ascii_case("y") {
            api.items.join_waitlist(&item.id).await?;
            println!("ウェイトリストに登録しました");
        }
        return Ok(());
    }

    let detail: ItemDetail = api.items.detail(&item.id).await?;
    let units: Vec<_> = detail.units.iter().filter(|u| u.is_selectable()).collect();
    if units.is_empty() {
        println!("選択できる個体がありません");
        return Ok(());
    }
    for (i, unit) in units.iter().enumerate() {
        println!("[{}] 資産番号 {}", i, unit.asset_no);
    }
    let unit_index: usize = prompt("個体の番号")?.parse()?;
    let unit = units
        .get(unit_index)
        .ok_or_else(|| anyhow::anyhow!("no unit at index {}", unit_index))?;

    match machine.submit(&RentSelection::hold(&unit.id)).await {
        SessionState::Success => {
            let rental = machine.outcome().expect("success carries the rental");
            match rental.reserve_expires_at {
                Some(expiry) => println!("予約しました。{} までに受け取ってください", expiry),
                None => println!("予約しました"),
            }
        }
        SessionState::SubmitFailed(msg) => println!("{}", msg),
        state => anyhow::bail!("unexpected state: {:?}", state),
    }
    Ok(())
}

async fn run_return_flow(
    api: &Api,
    auth: &AuthStore,
    photo: &Path,
    scanned: Option<String>,
) -> anyhow::Result<()> {
    let user = require_user(auth)?;
    let scanned = read_scan(scanned).await?;
    let token = scanned.as_deref().and_then(resolve_scanned_text);

    let validator = TokenValidator::new(api.qr.clone());
    let actions = ActionSubmitter::new(api.rentals.clone(), api.returns.clone());
    let machine = SessionMachine::new(ReturnFlow::new(
        validator,
        api.rentals.clone(),
        actions,
    ));

    match machine.start(token.as_deref(), &user).await {
        SessionState::ListReady => {}
        SessionState::ListEmpty => {
            println!("返却できる貸出はありません");
            return Ok(());
        }
        SessionState::TokenError(msg)
        | SessionState::Unauthorized(msg)
        | SessionState::ListError(msg) => {
            println!("{}", msg);
            return Ok(());
        }
        state => anyhow::bail!("unexpected state: {:?}", state),
    }

    let rentals = machine.entries();
    for (i, rental) in rentals.iter().enumerate() {
        println!(
            "[{}] {} (資産番号 {}, 返却期限 {})",
            i,
            rental.item_name.as_deref().unwrap_or(&rental.item_id),
            rental.asset_no.as_deref().unwrap_or("-"),
            rental
                .due_at
                .map(|d| d.to_string())
                .unwrap_or_else(|| "-".into()),
        );
    }
    let index: usize = prompt("返却する貸出の番号")?.parse()?;
    machine.select(index)?;

    // evidence photo: validated locally, then uploaded straight to storage
    let mut uploads = UploadManager::for_return_evidence(api.images.clone());
    if let Err(e) = uploads.attach(photo) {
        println!("{} ({})", e.user_message(), e);
        return Ok(());
    }
    uploads.upload_all().await;
    let image_key = match uploads.single_key() {
        Some(key) => key.to_string(),
        None => {
            for image in uploads.images() {
                println!("{}: {:?}", image.file_name, image.status);
            }
            println!("写真のアップロードに失敗しました。やり直してください");
            return Ok(());
        }
    };

    match machine.submit(&ReturnEvidence { image_key }).await {
        SessionState::Success => {
            let request = machine.outcome().expect("success carries the request");
            println!("返却申請を送信しました (受付番号 {})。承認をお待ちください", request.id);
        }
        SessionState::SubmitFailed(msg) => println!("{}", msg),
        state => anyhow::bail!("unexpected state: {:?}", state),
    }
    Ok(())
}

async fn run_qr_display(api: &Api, auth: &AuthStore) -> anyhow::Result<()> {
    let user = require_user(auth)?;
    let organization_id = user
        .scoped_organization_id()
        .ok_or_else(|| anyhow::anyhow!("管理者権限がありません"))?
        .to_string();
    let university_id = user
        .organization_info
        .university_id
        .clone()
        .unwrap_or_else(|| organization_id.clone());

    let handle = start_qr_display(OrgQrMetaFetcher {
        api: api.qr.clone(),
        university_id,
        organization_id,
        token_type: QrTokenType::Org,
    });
    let mut rx = handle.subscribe();

    println!("組織QRを表示中。Enterで終了します");
    let mut stdin = tokio::io::stdin();
    let mut buf = [0u8; 1];
    let mut stop = Box::pin(tokio::io::AsyncReadExt::read(&mut stdin, &mut buf));
    loop {
        tokio::select! {
            _ = &mut stop => break,
            changed = rx.changed() => {
                if changed.is_err() {
                    break;
                }
                match rx.borrow().clone() {
                    QrDisplayState::Loading => {}
                    QrDisplayState::Active { token, seconds_left } => {
                        println!("token={} (残り{}秒)", token, seconds_left);
                    }
                    QrDisplayState::Failed(msg) => {
                        println!("{}", msg);
                        break;
                    }
                }
            }
        }
    }
    handle.close();
    Ok(())
}

async fn run_admin_returns(api: &Api, auth: &AuthStore) -> anyhow::Result<()> {
    let user = require_user(auth)?;
    let organization_id = user.scoped_organization_id().map(String::from);

    let requests = api
        .returns
        .admin_list(Some(ReturnRequestStatus::Pending), organization_id.as_deref())
        .await?;
    if requests.is_empty() {
        println!("未処理の返却申請はありません");
        return Ok(());
    }
    for request in &requests {
        println!(
            "{}  rental={}  user={}  requested_at={}",
            request.id, request.rental_id, request.user_id, request.requested_at
        );
    }

    let id = prompt("確認する申請ID（空Enterで終了）")?;
    if id.is_empty() {
        return Ok(());
    }
    match api.returns.damage_suggestions(&id).await {
        Ok(suggestions) => {
            for s in &suggestions {
                println!("- {} (確度 {:.0}%)", s.summary, s.confidence * 100.0);
            }
        }
        Err(AppError::NotFound(_)) => println!("査定結果はまだありません"),
        Err(e) => println!("{}", e.user_message()),
    }

    let answer = prompt("この申請を承認しますか? [y/N]")?;
    if answer.eq_ignore_ascii_case("y") {
        api.returns.approve(&id).await?;
        println!("承認しました");
    }
    Ok(())
}

/// Unit-registration photo grid: every photo must upload before the
/// registration form may be submitted.
async fn run_upload_grid(api: &Api, photos: &[String]) -> anyhow::Result<()> {
    if photos.is_empty() {
        println!("{}", USAGE);
        return Ok(());
    }
    let mut uploads = UploadManager::for_unit_registration(api.images.clone(), 6);
    for photo in photos {
        if let Err(e) = uploads.attach(Path::new(photo)) {
            println!("{}: {}", photo, e);
            return Ok(());
        }
    }
    uploads.upload_all().await;
    for image in uploads.images() {
        println!("{}: {:?} key={:?}", image.file_name, image.status, image.key);
    }
    if !uploads.all_succeeded() {
        println!("失敗した写真を差し替えて、もう一度実行してください");
    }
    Ok(())
}

async fn run_signup(api: &Api, auth: &AuthStore) -> anyhow::Result<()> {
    let university_id = prompt("大学ID")?;
    let student_no = prompt("学籍番号")?;
    let name = prompt("氏名")?;
    let phone = prompt("電話番号")?;

    api.students
        .verify(&rust_rental::api::students::VerifyRequest {
            university_id: &university_id,
            student_no: &student_no,
            name: &name,
        })
        .await?;

    let user = api
        .students
        .signup(&rust_rental::api::students::SignupRequest {
            university_id: &university_id,
            student_no: &student_no,
            name: &name,
            phone: &phone,
        })
        .await?;
    auth.sign_in(user)?;
    println!("登録してログインしました");
    Ok(())
}
