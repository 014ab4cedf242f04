use proc_macro::TokenStream;
use proc_macro2::TokenStream as TokenStream2;
use quote::{format_ident, quote};
use syn::{parse_macro_input, spanned::Spanned, FnArg, Ident, ItemFn, Pat, Signature, Type};

/// Transform an asynchronous test into a synchronous one, build a fresh server
/// for it, optionally log in, and inject the client.
///
/// The only injectable dependency is [`rocket::local::asynchronous::Client`].
/// `#[backend_test(admin)]` logs in as the configured default administrator;
/// `#[backend_test(user)]` registers and logs in an ordinary account.
#[proc_macro_attribute]
pub fn backend_test(args: TokenStream, input: TokenStream) -> TokenStream {
    let mut item_fn = parse_macro_input!(input as ItemFn);

    // Extract type information and reject invalid function signatures.
    let test_args = match check_sig(item_fn.sig.clone()) {
        Ok(args) => args,
        Err(err) => {
            return err.into_compile_error().into();
        }
    };

    // Rename the future so the test can have its original name.
    let name = item_fn.sig.ident.clone();
    let new_name = format_ident!("{}_fut", name);
    item_fn.sig.ident = new_name.clone();

    // Log in the client as admin/user if needed.
    let maybe_login = match parse_macro_input!(args as Option<Ident>) {
        Some(arg) if arg == "admin" => quote! {
            {
                let response = rocket_client
                    .post(uri!(crate::api::auth::login))
                    .header(rocket::http::ContentType::JSON)
                    .body(rocket::serde::json::json!({
                        "username": crate::config::TEST_ADMIN_USERNAME,
                        "password": crate::config::TEST_ADMIN_PASSWORD,
                    }).to_string())
                    .dispatch()
                    .await;
                assert_eq!(rocket::http::Status::Ok, response.status());
            }
        },
        Some(arg) if arg == "user" => quote! {
            let credentials = rocket::serde::json::json!(
                crate::model::auth::Credentials::example1()
            ).to_string();
            for route in [uri!(crate::api::auth::register), uri!(crate::api::auth::login)] {
                let response = rocket_client
                    .post(route)
                    .header(rocket::http::ContentType::JSON)
                    .body(credentials.clone())
                    .dispatch()
                    .await;
                assert_eq!(rocket::http::Status::Ok, response.status());
            }
        },
        Some(arg) => {
            return syn::Error::new(arg.span(), "Expected `admin` or `user`")
                .into_compile_error()
                .into();
        }
        None => TokenStream2::new(),
    };

    // Rewrite the test function.
    quote! {
        #[test]
        fn #name() {
            /// Test setup.
            async fn setup() -> rocket::local::asynchronous::Client {
                log4rs_test_utils::test_logging::init_logging_once_for(
                    ["ballotrelay_backend"],
                    None,
                    None,
                );
                let rocket_client = rocket::local::asynchronous::Client::tracked(
                    crate::rocket_for_figment(crate::config::test_figment()),
                )
                .await
                .unwrap();

                #maybe_login

                rocket_client
            }

            /// The test itself.
            #item_fn

            let runtime = rocket::tokio::runtime::Builder::new_multi_thread()
                .thread_name("rocket-worker-test-thread")
                .worker_threads(1)
                .enable_all()
                .build()
                .unwrap();

            runtime.block_on(async {
                let rocket_client = setup().await;
                #new_name(#(#test_args),*).await
            });
        }
    }
    .into()
}

/// Ensure the wrapped test is async, extract parameters to inject, and reject unknown parameters.
fn check_sig(sig: Signature) -> Result<Vec<TokenStream2>, syn::Error> {
    if sig.asyncness.is_none() {
        return Err(syn::Error::new(sig.span(), "Test must be marked `async`"));
    }

    let mut args = vec![];
    for input in &sig.inputs {
        if let FnArg::Typed(pat_type) = input {
            if let (Pat::Ident(_), Type::Path(type_path)) = (&*pat_type.pat, &*pat_type.ty) {
                if type_path
                    .path
                    .segments
                    .last()
                    .map_or(false, |segment| segment.ident == "Client")
                {
                    if !args.is_empty() {
                        return Err(syn::Error::new(
                            input.span(),
                            "Test cannot accept more than one `rocket::local::asynchronous::Client`",
                        ));
                    }
                    args.push(quote! { rocket_client });
                    continue;
                }
            }
        }

        return Err(syn::Error::new(
            input.span(),
            "Expected `client_ident: Client`",
        ));
    }

    Ok(args)
}
