//! Have I Been Pwned CLI 工具

use clap::{Parser, Subcommand};
use hibp_core::{
    BreachedAccount, BreachedAccountOptions, ClientConfig, Error, HibpClient, Settings,
};
use std::io::BufRead;
use tracing::debug;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "hibp")]
#[command(about = "Have I Been Pwned 查询工具", long_about = None)]
struct Cli {
    /// API Key（默认读取 HIBP_API_KEY 环境变量）
    #[arg(short = 'k', long)]
    api_key: Option<String>,

    /// User-Agent
    #[arg(long)]
    user_agent: Option<String>,

    /// 请求超时（秒）
    #[arg(short, long, default_value_t = 30)]
    timeout: u64,

    /// 以 JSON 输出
    #[arg(long)]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// 查询账号涉及的泄露事件（需要 API Key）
    Account {
        /// 账号（用户名或邮箱）
        account: String,
        /// 只返回该域名下的泄露
        #[arg(short, long)]
        domain: Option<String>,
        /// 包含未验证的泄露
        #[arg(long)]
        include_unverified: bool,
        /// 返回完整记录而不是仅名称
        #[arg(long)]
        full: bool,
    },
    /// 列出全部泄露事件
    Breaches {
        /// 按域名过滤
        #[arg(short, long)]
        domain: Option<String>,
    },
    /// 查询单个泄露事件
    Breach {
        /// 泄露事件名称（不是域名）
        name: String,
    },
    /// 列出全部数据类别
    DataClasses,
    /// 查询邮箱出现过的 paste（需要 API Key）
    Pastes {
        /// 邮箱
        email: String,
    },
    /// 使用 k-匿名方式查询密码泄露次数
    Password {
        /// 明文密码（省略时从标准输入读取一行）
        password: Option<String>,
        /// 直接使用 SHA-1 摘要
        #[arg(long, conflicts_with = "password")]
        sha1: Option<String>,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let settings = match cli.api_key.clone() {
        Some(api_key) => Settings::new(Some(api_key)),
        None => Settings::from_env(),
    };

    let mut config = ClientConfig {
        settings,
        timeout: cli.timeout,
        ..ClientConfig::default()
    };
    if let Some(user_agent) = cli.user_agent.clone() {
        config.user_agent = user_agent;
    }

    debug!(
        "API key configured: {}, timeout: {}s",
        config.settings.api_key.is_some(),
        config.timeout
    );
    let client = HibpClient::new(config)?;

    let result = match cli.command {
        Commands::Account { account, domain, include_unverified, full } => {
            let options = BreachedAccountOptions {
                domain,
                include_unverified: include_unverified.then_some(true),
                truncate_response: Some(!full),
            };
            do_account(&client, &account, &options, cli.json).await
        }
        Commands::Breaches { domain } => do_breaches(&client, domain.as_deref(), cli.json).await,
        Commands::Breach { name } => do_breach(&client, &name, cli.json).await,
        Commands::DataClasses => do_data_classes(&client, cli.json).await,
        Commands::Pastes { email } => do_pastes(&client, &email, cli.json).await,
        Commands::Password { password, sha1 } => do_password(&client, password, sha1, cli.json).await,
    };

    result.map_err(explain)
}

/// 为常见错误附加提示
fn explain(err: anyhow::Error) -> anyhow::Error {
    match err.downcast_ref::<Error>() {
        Some(Error::TooManyRequests { retry_after }) => {
            anyhow::anyhow!("请求过于频繁，请在 {} 秒后重试", retry_after)
        }
        Some(Error::MissingApiKey { .. }) => {
            anyhow::anyhow!("该查询需要 API Key，请使用 --api-key 或设置 HIBP_API_KEY")
        }
        Some(Error::Unauthorised) => anyhow::anyhow!("API Key 无效或未提供"),
        _ => err,
    }
}

async fn do_account(
    client: &HibpClient,
    account: &str,
    options: &BreachedAccountOptions,
    json: bool,
) -> anyhow::Result<()> {
    let breaches = match client.breached_account(account, options).await {
        Ok(breaches) => breaches,
        // 404 表示账号未出现在任何泄露中
        Err(Error::NotFound) => BreachedAccount::Truncated(Vec::new()),
        Err(e) => return Err(e.into()),
    };

    if json {
        println!("{}", serde_json::to_string_pretty(&breaches)?);
        return Ok(());
    }

    if breaches.is_empty() {
        println!("未发现泄露: {}", account);
        return Ok(());
    }

    println!("{} 出现在 {} 次泄露中:", account, breaches.len());
    match &breaches {
        BreachedAccount::Full(list) => {
            for breach in list {
                println!("  {} ({}) - {} 个账号", breach, breach.breach_date, breach.pwn_count);
            }
        }
        BreachedAccount::Truncated(names) => {
            for name in names {
                println!("  {}", name);
            }
        }
    }

    Ok(())
}

async fn do_breaches(client: &HibpClient, domain: Option<&str>, json: bool) -> anyhow::Result<()> {
    let breaches = client.breaches(domain).await?;

    if json {
        println!("{}", serde_json::to_string_pretty(&breaches)?);
        return Ok(());
    }

    println!("共 {} 次泄露", breaches.len());
    for breach in &breaches {
        println!("  {} [{}] {}", breach.name, breach.breach_date, breach);
    }

    Ok(())
}

async fn do_breach(client: &HibpClient, name: &str, json: bool) -> anyhow::Result<()> {
    let breach = client.breach(name).await?;

    if json {
        println!("{}", serde_json::to_string_pretty(&breach)?);
        return Ok(());
    }

    println!("名称: {}", breach.name);
    println!("标题: {}", breach.title);
    println!("域名: {}", breach.domain);
    println!("泄露日期: {}", breach.breach_date);
    println!("收录时间: {}", breach.added_date);
    println!("账号数: {}", breach.pwn_count);
    println!("数据类别: {}", breach.data_classes.join(", "));
    println!(
        "已验证: {} | 伪造: {} | 敏感: {} | 已退役: {} | 垃圾列表: {}",
        breach.is_verified, breach.is_fabricated, breach.is_sensitive, breach.is_retired, breach.is_spam_list
    );

    Ok(())
}

async fn do_data_classes(client: &HibpClient, json: bool) -> anyhow::Result<()> {
    let classes = client.data_classes().await?;

    if json {
        println!("{}", serde_json::to_string_pretty(&classes)?);
    } else {
        for class in &classes {
            println!("{}", class);
        }
    }

    Ok(())
}

async fn do_pastes(client: &HibpClient, email: &str, json: bool) -> anyhow::Result<()> {
    let pastes = match client.pastes(email).await {
        Ok(pastes) => pastes,
        Err(Error::NotFound) => Vec::new(),
        Err(e) => return Err(e.into()),
    };

    if json {
        println!("{}", serde_json::to_string_pretty(&pastes)?);
        return Ok(());
    }

    if pastes.is_empty() {
        println!("未发现 paste: {}", email);
        return Ok(());
    }

    println!("{} 出现在 {} 个 paste 中:", email, pastes.len());
    for paste in &pastes {
        let date = paste
            .date
            .map(|date| date.to_rfc3339())
            .unwrap_or_else(|| "-".to_string());
        println!("  {} ({}) - {} 个邮箱", paste, date, paste.email_count);
    }

    Ok(())
}

async fn do_password(
    client: &HibpClient,
    password: Option<String>,
    sha1: Option<String>,
    json: bool,
) -> anyhow::Result<()> {
    let count = match (password, sha1) {
        (_, Some(digest)) => client.search_range(&digest).await?,
        (Some(password), None) => client.search_password(&password).await?,
        (None, None) => {
            let mut line = String::new();
            std::io::stdin().lock().read_line(&mut line)?;
            let password = line.trim_end_matches(['\r', '\n']);
            if password.is_empty() {
                anyhow::bail!("未提供密码");
            }
            client.search_password(password).await?
        }
    };

    if json {
        println!("{}", serde_json::json!({ "count": count }));
    } else if count > 0 {
        println!("该密码已在泄露数据中出现 {} 次，请勿使用", count);
    } else {
        println!("未在泄露数据中发现该密码");
    }

    Ok(())
}
