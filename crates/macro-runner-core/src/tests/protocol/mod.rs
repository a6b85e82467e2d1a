mod launch_args;
